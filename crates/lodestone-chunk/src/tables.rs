/// Read-only reference tables the decoder cross-references against.
///
/// The serialization layer loads these from static JSON assets once and
/// passes them in; decode never mutates them. Lookups that miss leave the
/// corresponding field unset rather than erroring.
pub trait ReferenceTables {
    /// Semantic biome id (e.g. `"plains"`) for a numeric biome id.
    fn biome_name(&self, numeric_id: i64) -> Option<String>;

    /// Namespaced `plugin:name` id for a legacy numeric block id.
    fn block_id_name(&self, block_id: i64) -> Option<String>;
}
