// src/cloudcrew/tools/mod.rs

pub mod arm;
pub mod resource_graph;
pub mod resource_tags;

pub use arm::ArmClient;
pub use resource_graph::ResourceGraphQueryTool;
pub use resource_tags::ResourceTagTool;
