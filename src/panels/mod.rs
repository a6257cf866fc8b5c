mod layers;
mod properties;
mod tools;

pub use layers::{LayerEntry, LayerPanel, layers_panel};
pub use properties::{PropertiesPanel, PropertiesView, PropertyEdit, properties_panel};
pub use tools::tools_panel;
