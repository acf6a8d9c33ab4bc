pub mod tree_map;

pub use tree_map::TreeMap;
