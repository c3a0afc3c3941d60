pub mod adt_node;
pub mod model_node;
pub mod placement;
pub mod texture_node;
pub mod wmo_node;
