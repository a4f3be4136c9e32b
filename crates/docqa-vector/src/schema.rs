use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const POSITION_COLUMN: &str = "position";
pub const VECTOR_COLUMN: &str = "vector";

pub fn build_arrow_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(POSITION_COLUMN, DataType::Int64, false),
		Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}
