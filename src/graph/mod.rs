pub mod relation_dag;

pub use relation_dag::{GraphError, RelationDag};
