//! Infrastructure layer: event store, command dispatch, read models,
//! projections, id allocation, tabular decoding.

pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod sequence;
pub mod tabular;


pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use projections::{PartiesProjection, PartyRecord, ProjectionError, RequestRecord, RequestsProjection};
pub use read_model::{InMemoryStore, ReadModelStore};
pub use sequence::IdSequence;
pub use tabular::{decode_csv_grid, TabularError};
