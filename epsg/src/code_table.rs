use crate::result::{Error, Result};
use crate::srs::{defaults, CoordinateSystemCode, SpatialReferenceDefinition};
use crate::BaseLoader;
use std::collections::HashMap;

/// The base definitions of geographic and projected coordinate systems, held in memory.
#[derive(Debug, Clone, Default)]
pub struct CodeTable {
    definitions: HashMap<CoordinateSystemCode, SpatialReferenceDefinition>,
}

impl CodeTable {
    pub fn new() -> Self {
        CodeTable {
            definitions: HashMap::new(),
        }
    }

    /// A table holding the definitions that ship with the crate
    pub fn builtin() -> Self {
        defaults::DEFINITIONS
            .iter()
            .map(defaults::SeedDefinition::to_definition)
            .collect()
    }

    /// Add a definition, replacing and returning any previous definition for the same code.
    pub fn insert(
        &mut self,
        definition: SpatialReferenceDefinition,
    ) -> Option<SpatialReferenceDefinition> {
        self.definitions.insert(definition.code, definition)
    }

    pub fn contains(&self, code: CoordinateSystemCode) -> bool {
        self.definitions.contains_key(&code)
    }

    pub fn codes(&self) -> impl Iterator<Item = CoordinateSystemCode> + '_ {
        self.definitions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl BaseLoader for CodeTable {
    fn load_base(&self, code: CoordinateSystemCode) -> Result<SpatialReferenceDefinition> {
        self.definitions
            .get(&code)
            .cloned()
            .ok_or(Error::UnknownCode(code))
    }
}

impl FromIterator<SpatialReferenceDefinition> for CodeTable {
    fn from_iter<I: IntoIterator<Item = SpatialReferenceDefinition>>(iter: I) -> Self {
        let mut table = CodeTable::new();
        for definition in iter {
            table.insert(definition);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srs::CoordinateSystemKind;

    #[test]
    fn builtin_holds_every_seed() {
        let table = CodeTable::builtin();
        assert_eq!(table.len(), defaults::DEFINITIONS.len());
        for seed in defaults::DEFINITIONS {
            assert!(table.contains(seed.code.into()));
        }
    }

    #[test]
    fn load_known_code() {
        let table = CodeTable::builtin();
        let def = table.load_base(CoordinateSystemCode::new(26591)).unwrap();
        assert_eq!(def.kind, CoordinateSystemKind::Projected);
        assert_eq!(def.get_parameter("central_meridian").unwrap(), 9.0);
        assert_eq!(def.geographic_code, Some(CoordinateSystemCode::new(4806)));
    }

    #[test]
    fn load_unknown_code() {
        let table = CodeTable::builtin();
        assert!(matches!(
            table.load_base(CoordinateSystemCode::new(0)),
            Err(Error::UnknownCode(code)) if code.get() == 0
        ));
    }

    #[test]
    fn insert_replaces() {
        let mut table = CodeTable::new();
        let code = CoordinateSystemCode::new(9999);
        let first = SpatialReferenceDefinition::new(code, CoordinateSystemKind::Geographic, "a");
        let second = SpatialReferenceDefinition::new(code, CoordinateSystemKind::Geographic, "b");
        assert!(table.insert(first).is_none());
        assert_eq!(table.insert(second).unwrap().name, "a");
        assert_eq!(table.load_base(code).unwrap().name, "b");
    }
}
