//! Champion reference data.
//!
//! Loaded once at startup and never mutated by the aggregator or scorer.

use crate::error::AppError;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChampionId(pub u32);

impl fmt::Display for ChampionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lane role. Declaration order is the lane order used for role recommendations.
/// Parsing ignores case and accepts the feed aliases `MIDDLE`, `BOTTOM` and `UTILITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Role {
    Top,
    Jungle,
    Mid,
    #[serde(rename = "ADC")]
    Adc,
    Support,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Top, Role::Jungle, Role::Mid, Role::Adc, Role::Support];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Top => "Top",
            Role::Jungle => "Jungle",
            Role::Mid => "Mid",
            Role::Adc => "ADC",
            Role::Support => "Support",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Role::Top),
            "jungle" => Ok(Role::Jungle),
            "mid" | "middle" => Ok(Role::Mid),
            "adc" | "bottom" => Ok(Role::Adc),
            "support" | "utility" => Ok(Role::Support),
            _ => Err(AppError::invalid(format!("unknown role '{}'", raw))),
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Champion {
    pub id: ChampionId,
    pub name: String,
    pub role: Role,
}

impl Champion {
    pub fn new(id: u32, name: &str, role: Role) -> Self {
        Champion {
            id: ChampionId(id),
            name: name.to_string(),
            role,
        }
    }
}

/// How draft clients name a champion: a numeric id, a name, or a full
/// champion object of which only `id` is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChampionRef {
    Id(u32),
    Name(String),
    Entry { id: u32 },
}

#[derive(Debug, Clone, Default)]
pub struct ChampionCatalog {
    champions: BTreeMap<ChampionId, Champion>,
    by_name: HashMap<String, ChampionId>,
}

impl ChampionCatalog {
    pub fn new(champions: Vec<Champion>) -> Result<Self, AppError> {
        let mut catalog = ChampionCatalog::default();

        for champion in champions {
            let key = champion.name.to_lowercase();
            if catalog.champions.contains_key(&champion.id) {
                return Err(AppError::invalid(format!(
                    "duplicate champion id {} in reference data",
                    champion.id
                )));
            }
            if catalog.by_name.contains_key(&key) {
                return Err(AppError::invalid(format!(
                    "duplicate champion name '{}' in reference data",
                    champion.name
                )));
            }
            catalog.by_name.insert(key, champion.id);
            catalog.champions.insert(champion.id, champion);
        }

        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!(
                "Failed to read champion list {}: {}",
                path.display(),
                e
            ))
        })?;
        let champions: Vec<Champion> = serde_json::from_str(&content).map_err(|e| {
            AppError::JsonError(format!("Failed to parse champion list: {}", e))
        })?;
        Self::new(champions)
    }

    /// Every champion, ordered by id.
    pub fn all_champions(&self) -> Vec<Champion> {
        self.champions.values().cloned().collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = ChampionId> + '_ {
        self.champions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.champions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.champions.is_empty()
    }

    pub fn contains(&self, id: ChampionId) -> bool {
        self.champions.contains_key(&id)
    }

    pub fn get(&self, id: ChampionId) -> Result<&Champion, AppError> {
        self.champions
            .get(&id)
            .ok_or_else(|| AppError::invalid(format!("unknown champion id {}", id.0)))
    }

    pub fn role_of(&self, id: ChampionId) -> Result<Role, AppError> {
        self.get(id).map(|c| c.role)
    }

    pub fn name_of(&self, id: ChampionId) -> Result<&str, AppError> {
        self.get(id).map(|c| c.name.as_str())
    }

    /// Case-insensitive name lookup.
    pub fn find_by_name(&self, name: &str) -> Result<ChampionId, AppError> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .copied()
            .ok_or_else(|| AppError::invalid(format!("unknown champion '{}'", name)))
    }

    pub fn resolve(&self, reference: &ChampionRef) -> Result<ChampionId, AppError> {
        match reference {
            ChampionRef::Id(raw) | ChampionRef::Entry { id: raw } => {
                let id = ChampionId(*raw);
                self.get(id)?;
                Ok(id)
            }
            ChampionRef::Name(name) => match name.trim().parse::<u32>() {
                Ok(raw) => self.resolve(&ChampionRef::Id(raw)),
                Err(_) => self.find_by_name(name),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ChampionCatalog {
        ChampionCatalog::new(vec![
            Champion::new(61, "Orianna", Role::Mid),
            Champion::new(134, "Syndra", Role::Mid),
            Champion::new(64, "Lee Sin", Role::Jungle),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_by_name_and_id() {
        let catalog = catalog();
        assert_eq!(catalog.resolve(&ChampionRef::Name("orianna".into())).unwrap(), ChampionId(61));
        assert_eq!(catalog.resolve(&ChampionRef::Id(134)).unwrap(), ChampionId(134));
        assert_eq!(catalog.resolve(&ChampionRef::Name("64".into())).unwrap(), ChampionId(64));
    }

    #[test]
    fn test_champion_object_reference() {
        let reference: ChampionRef =
            serde_json::from_str(r#"{"id": 61, "name": "Orianna", "role": "Mid", "image": "x.png"}"#)
                .unwrap();
        assert_eq!(catalog().resolve(&reference).unwrap(), ChampionId(61));
    }

    #[test]
    fn test_unknown_champion_is_invalid_input() {
        let catalog = catalog();
        assert!(matches!(catalog.role_of(ChampionId(1)), Err(AppError::InvalidInput(_))));
        assert!(matches!(
            catalog.resolve(&ChampionRef::Name("Teemo".into())),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = ChampionCatalog::new(vec![
            Champion::new(1, "A", Role::Top),
            Champion::new(1, "B", Role::Top),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_role_aliases() {
        let role: Role = serde_json::from_str("\"UTILITY\"").unwrap();
        assert_eq!(role, Role::Support);
        let role: Role = serde_json::from_str("\"MIDDLE\"").unwrap();
        assert_eq!(role, Role::Mid);
        assert_eq!(serde_json::to_string(&Role::Adc).unwrap(), "\"ADC\"");
    }

    #[test]
    fn test_role_parsing_ignores_case() {
        for (raw, expected) in [
            ("tOp", Role::Top),
            ("JUNGLE", Role::Jungle),
            ("Middle", Role::Mid),
            ("bOtToM", Role::Adc),
            (" adc ", Role::Adc),
            ("Utility", Role::Support),
        ] {
            let role: Role = serde_json::from_str(&format!("\"{}\"", raw)).unwrap();
            assert_eq!(role, expected, "{}", raw);
        }
        assert!(serde_json::from_str::<Role>("\"roamer\"").is_err());
        assert!(matches!("".parse::<Role>(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_all_champions_ordered_by_id() {
        let ids: Vec<u32> = catalog().all_champions().iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![61, 64, 134]);
    }
}
