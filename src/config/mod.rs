/// Configuration loader (spec §2 ambient, §3).
///
/// `xmltree` is the generic tree-structured document reader; `calibration_config`
/// maps its output onto the data model the rest of the engine consumes.
pub mod xmltree;
pub mod calibration_config;
