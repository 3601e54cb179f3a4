//! Per-user gesture → function table.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::gesture::GestureType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FunctionType {
    Unused,
    Select,
    Filter,
    Clear,
    Zoom,
    SwitchChart,
    SwitchData,
    Click,
    Draw,
}

impl FunctionType {
    pub const ALL: [FunctionType; 9] = [
        Self::Unused,
        Self::Select,
        Self::Filter,
        Self::Clear,
        Self::Zoom,
        Self::SwitchChart,
        Self::SwitchData,
        Self::Click,
        Self::Draw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unused => "UNUSED",
            Self::Select => "SELECT",
            Self::Filter => "FILTER",
            Self::Clear => "CLEAR",
            Self::Zoom => "ZOOM",
            Self::SwitchChart => "SWITCH_CHART",
            Self::SwitchData => "SWITCH_DATA",
            Self::Click => "CLICK",
            Self::Draw => "DRAW",
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FunctionType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|function| function.as_str() == value)
            .ok_or_else(|| anyhow!("unknown function type '{value}'"))
    }
}

/// Total mapping from every gesture to a function. Outside UNUSED, each
/// function belongs to at most one gesture; [`GestureMapping::assign`] keeps
/// that true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GestureMapping {
    entries: BTreeMap<GestureType, FunctionType>,
}

impl Default for GestureMapping {
    fn default() -> Self {
        let mut mapping = Self::unused();
        for (gesture, function) in [
            (GestureType::ClosedFist, FunctionType::Filter),
            (GestureType::OpenPalm, FunctionType::Clear),
            (GestureType::PointingUp, FunctionType::Select),
            (GestureType::Pinch, FunctionType::Click),
            (GestureType::DoublePinch, FunctionType::Zoom),
            (GestureType::TwoFingerPointingLeft, FunctionType::SwitchChart),
            (GestureType::TwoFingerPointingRight, FunctionType::SwitchData),
        ] {
            mapping.entries.insert(gesture, function);
        }
        mapping
    }
}

impl GestureMapping {
    /// Every gesture mapped to UNUSED.
    pub fn unused() -> Self {
        Self {
            entries: GestureType::ALL
                .iter()
                .map(|&gesture| (gesture, FunctionType::Unused))
                .collect(),
        }
    }

    /// Rebuilds a mapping from stored pairs as-is. Gestures without a pair map
    /// to UNUSED. Uniqueness is not re-checked here.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (GestureType, FunctionType)>,
    {
        let mut mapping = Self::unused();
        mapping.entries.extend(pairs);
        mapping
    }

    pub fn get(&self, gesture: GestureType) -> FunctionType {
        self.entries
            .get(&gesture)
            .copied()
            .unwrap_or(FunctionType::Unused)
    }

    pub fn gesture_for(&self, function: FunctionType) -> Option<GestureType> {
        if function == FunctionType::Unused {
            return None;
        }
        self.entries
            .iter()
            .find(|(_, &f)| f == function)
            .map(|(&g, _)| g)
    }

    /// Maps `gesture` to `function`. Any other gesture that held `function` is
    /// reset to UNUSED and returned.
    pub fn assign(&mut self, gesture: GestureType, function: FunctionType) -> Option<GestureType> {
        let displaced = if function == FunctionType::Unused {
            None
        } else {
            self.entries
                .iter()
                .find(|(&g, &f)| f == function && g != gesture)
                .map(|(&g, _)| g)
        };

        if let Some(previous) = displaced {
            self.entries.insert(previous, FunctionType::Unused);
        }
        self.entries.insert(gesture, function);
        displaced
    }

    /// All 13 gestures in declaration order with their function.
    pub fn iter(&self) -> impl Iterator<Item = (GestureType, FunctionType)> + '_ {
        GestureType::ALL
            .iter()
            .map(move |&gesture| (gesture, self.get(gesture)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping() {
        let mapping = GestureMapping::default();
        assert_eq!(mapping.get(GestureType::ClosedFist), FunctionType::Filter);
        assert_eq!(mapping.get(GestureType::OpenPalm), FunctionType::Clear);
        assert_eq!(mapping.get(GestureType::PointingUp), FunctionType::Select);
        assert_eq!(mapping.get(GestureType::Pinch), FunctionType::Click);
        assert_eq!(mapping.get(GestureType::DoublePinch), FunctionType::Zoom);
        assert_eq!(
            mapping.get(GestureType::TwoFingerPointingLeft),
            FunctionType::SwitchChart
        );
        assert_eq!(
            mapping.get(GestureType::TwoFingerPointingRight),
            FunctionType::SwitchData
        );
        for gesture in [
            GestureType::ILoveYou,
            GestureType::Unidentified,
            GestureType::ThumbDown,
            GestureType::ThumbUp,
            GestureType::Victory,
            GestureType::Draw,
        ] {
            assert_eq!(mapping.get(gesture), FunctionType::Unused);
        }
        assert_eq!(mapping.iter().count(), 13);
    }

    #[test]
    fn test_assign_clears_previous_owner() {
        let mut mapping = GestureMapping::default();
        let displaced = mapping.assign(GestureType::Victory, FunctionType::Filter);

        assert_eq!(displaced, Some(GestureType::ClosedFist));
        assert_eq!(mapping.get(GestureType::ClosedFist), FunctionType::Unused);
        assert_eq!(mapping.get(GestureType::Victory), FunctionType::Filter);
        assert_eq!(mapping.gesture_for(FunctionType::Filter), Some(GestureType::Victory));
    }

    #[test]
    fn test_assign_unused_never_displaces() {
        let mut mapping = GestureMapping::default();
        assert_eq!(mapping.assign(GestureType::PointingUp, FunctionType::Unused), None);
        assert_eq!(mapping.get(GestureType::PointingUp), FunctionType::Unused);
        assert_eq!(mapping.get(GestureType::ILoveYou), FunctionType::Unused);
    }

    #[test]
    fn test_reassigning_same_pair_is_noop() {
        let mut mapping = GestureMapping::default();
        assert_eq!(mapping.assign(GestureType::Pinch, FunctionType::Click), None);
        assert_eq!(mapping, GestureMapping::default());
    }

    #[test]
    fn test_serializes_as_gesture_keyed_object() {
        let json = serde_json::to_value(GestureMapping::default()).unwrap();
        assert_eq!(json["CLOSED_FIST"], "FILTER");
        assert_eq!(json["DRAW"], "UNUSED");

        let parsed: GestureMapping = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, GestureMapping::default());
    }
}
