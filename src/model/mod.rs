/*!
The deltalake-rs model package consists of data structures that know how
to serialise and deserialise the delta table format.
*/

pub mod actions;
pub mod checkpoint;
pub mod metadata;
pub mod schema;
