/// This module will handle converting the types from sargerust-files into GPU ready vertex and index data,
/// that the asset graph nodes then keep for the draw submitters.
/// This abstraction is made to be a) render backend agnostic and b) keep the complexity that is the asset files
/// themselves out of the nodes.
pub mod adt_importer;
pub mod m2_importer;
pub mod wmo_importer;
