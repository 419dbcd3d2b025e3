// ── World settings file ──
//
// `PalWorldSettings.ini` keeps every option on one line:
//
//     [/Script/Pal.PalGameWorldSettings]
//     OptionSettings=(Difficulty=None,ServerName="My Server",CrossplayPlatforms=(Steam,Xbox),...)
//
// Values may be quoted and may contain parenthesised lists, so splitting
// tracks both. Rewrites touch only the bytes of changed values.

use std::fmt;
use std::ops::Range;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::CoreError;

const SECTION_HEADER: &str = "[/Script/Pal.PalGameWorldSettings]";
const OPTION_PREFIX: &str = "OptionSettings=(";

// ── Field catalogue ──────────────────────────────────────────────

/// Value shape of a known option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Integer,
    Float,
    Text,
    Choice(&'static [&'static str]),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("True or False"),
            Self::Integer => f.write_str("an integer"),
            Self::Float => f.write_str("a number"),
            Self::Text => f.write_str("text"),
            Self::Choice(options) => write!(f, "one of {}", options.join(", ")),
        }
    }
}

/// A documented option with its kind and stock default.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub kind: FieldKind,
    pub default: &'static str,
}

const fn spec(key: &'static str, kind: FieldKind, default: &'static str) -> FieldSpec {
    FieldSpec { key, kind, default }
}

const DIFFICULTY: &[&str] = &["None", "Easy", "Normal", "Hard"];
const DEATH_PENALTY: &[&str] = &["None", "Item", "ItemAndEquipment", "All"];
const RANDOMIZER: &[&str] = &["None", "Region", "All"];
const LOG_FORMAT: &[&str] = &["Text", "Json"];

use FieldKind::{Bool, Choice, Float, Integer, Text};

/// Every option the manager knows how to validate, in file order.
pub static FIELDS: &[FieldSpec] = &[
    // Server
    spec("ServerName", Text, "PalWorld Server"),
    spec("ServerDescription", Text, "A PalWorld server"),
    spec("AdminPassword", Text, ""),
    spec("ServerPassword", Text, ""),
    spec("ServerPlayerMaxNum", Integer, "32"),
    spec("PublicIP", Text, ""),
    spec("PublicPort", Integer, "8211"),
    // Balance
    spec("Difficulty", Choice(DIFFICULTY), "Normal"),
    spec("DayTimeSpeedRate", Float, "1.000000"),
    spec("NightTimeSpeedRate", Float, "1.000000"),
    spec("ExpRate", Float, "1.000000"),
    spec("DeathPenalty", Choice(DEATH_PENALTY), "All"),
    spec("GuildPlayerMaxNum", Integer, "20"),
    // Pals
    spec("PalCaptureRate", Float, "1.000000"),
    spec("PalSpawnNumRate", Float, "1.000000"),
    spec("PalDamageRateAttack", Float, "1.000000"),
    spec("PalDamageRateDefense", Float, "1.000000"),
    spec("PalStaminaDecreaceRate", Float, "1.000000"),
    spec("PalStomachDecreaceRate", Float, "1.000000"),
    spec("PalAutoHPRegeneRate", Float, "1.000000"),
    spec("PalAutoHpRegeneRateInSleep", Float, "1.000000"),
    spec("PalEggDefaultHatchingTime", Float, "72.000000"),
    // Players
    spec("PlayerDamageRateAttack", Float, "1.000000"),
    spec("PlayerDamageRateDefense", Float, "1.000000"),
    spec("PlayerStaminaDecreaceRate", Float, "1.000000"),
    spec("PlayerStomachDecreaceRate", Float, "1.000000"),
    spec("PlayerAutoHPRegeneRate", Float, "1.000000"),
    spec("PlayerAutoHpRegeneRateInSleep", Float, "1.000000"),
    // Base camps
    spec("BaseCampMaxNumInGuild", Integer, "4"),
    spec("BaseCampWorkerMaxNum", Integer, "15"),
    // Building
    spec("BuildObjectDamageRate", Float, "1.000000"),
    spec("BuildObjectDeteriorationDamageRate", Float, "1.000000"),
    spec("MaxBuildingLimitNum", Integer, "0"),
    // Gathering and drops
    spec("CollectionDropRate", Float, "1.000000"),
    spec("CollectionObjectHpRate", Float, "1.000000"),
    spec("CollectionObjectRespawnSpeedRate", Float, "1.000000"),
    spec("EnemyDropItemRate", Float, "1.000000"),
    spec("ItemWeightRate", Float, "1.000000"),
    spec("EquipmentDurabilityDamageRate", Float, "1.000000"),
    // Gameplay toggles
    spec("bEnableFastTravel", Bool, "True"),
    spec("bEnableInvaderEnemy", Bool, "True"),
    spec("bHardcore", Bool, "False"),
    spec("bPalLost", Bool, "False"),
    spec("bShowPlayerList", Bool, "True"),
    spec("bCharacterRecreateInHardcore", Bool, "False"),
    spec("bInvisibleOtherGuildBaseCampAreaFX", Bool, "False"),
    spec("bIsRandomizerPalLevelRandom", Bool, "False"),
    spec("bIsUseBackupSaveData", Bool, "True"),
    spec("bBuildAreaLimit", Bool, "False"),
    spec("bAllowGlobalPalboxExport", Bool, "False"),
    spec("bAllowGlobalPalboxImport", Bool, "False"),
    // Randomizer
    spec("RandomizerSeed", Integer, "0"),
    spec("RandomizerType", Choice(RANDOMIZER), "None"),
    // Crossplay
    spec("CrossplayPlatforms", Text, "(Steam,Xbox,PS5,Mac)"),
    spec("AllowConnectPlatform", Text, ""),
    // Misc
    spec("ChatPostLimitPerMinute", Integer, "0"),
    spec("SupplyDropSpan", Integer, "0"),
    spec("ServerReplicatePawnCullDistance", Integer, "10000"),
    spec("ItemContainerForceMarkDirtyInterval", Integer, "5"),
    // Remote administration
    spec("RESTAPIEnabled", Bool, "True"),
    spec("RESTAPIPort", Integer, "8212"),
    spec("RCONEnabled", Bool, "False"),
    spec("RCONPort", Integer, "25575"),
    spec("LogFormatType", Choice(LOG_FORMAT), "Text"),
];

/// Look up a known option by exact key.
pub fn field(key: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.key == key)
}

// ── WorldSettings ────────────────────────────────────────────────

/// Ordered option map read from a settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WorldSettings {
    values: IndexMap<String, String>,
}

impl WorldSettings {
    /// Parse the `OptionSettings=(...)` line. Surrounding quotes are
    /// stripped from values.
    pub fn parse(content: &str) -> Result<Self, CoreError> {
        let span = option_span(content)?;
        let values = split_pairs(content, span)
            .into_iter()
            .map(|pair| {
                let raw = &content[pair.value.clone()];
                (pair.key.to_owned(), unquote(raw).to_owned())
            })
            .collect();
        Ok(Self { values })
    }

    /// Stock values for every known option.
    pub fn defaults() -> Self {
        Self {
            values: FIELDS
                .iter()
                .map(|f| (f.key.to_owned(), f.default.to_owned()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Insert or replace a value, keeping the position of existing keys.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &IndexMap<String, String> {
        &self.values
    }

    /// Keys whose value in `other` differs from (or is missing in) `self`.
    pub fn changes_to(&self, other: &Self) -> IndexMap<String, String> {
        other
            .values
            .iter()
            .filter(|(k, v)| self.values.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Render a complete settings file.
    pub fn to_ini(&self) -> String {
        let body = self
            .values
            .iter()
            .map(|(k, v)| format!("{k}={}", format_new_value(k, v)))
            .collect::<Vec<_>>()
            .join(",");
        format!("{SECTION_HEADER}\n{OPTION_PREFIX}{body})\n")
    }

    /// Check every known option against its kind.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        self.iter()
            .filter_map(|(key, value)| {
                let spec = field(key)?;
                (!accepts(spec.kind, value)).then(|| ValidationIssue {
                    key: key.to_owned(),
                    value: value.to_owned(),
                    expected: spec.kind,
                })
            })
            .collect()
    }
}

/// One option whose value does not fit its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub key: String,
    pub value: String,
    pub expected: FieldKind,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {:?}: expected {}",
            self.key, self.value, self.expected
        )
    }
}

fn accepts(kind: FieldKind, value: &str) -> bool {
    match kind {
        FieldKind::Bool => {
            value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
        }
        FieldKind::Integer => value.parse::<i64>().is_ok(),
        FieldKind::Float => value.parse::<f64>().is_ok(),
        FieldKind::Text => true,
        FieldKind::Choice(options) => options.contains(&value),
    }
}

// ── In-place rewrite ─────────────────────────────────────────────

/// Rewrite `original` with `changes` applied.
///
/// Only values that actually differ are replaced; quoting of existing
/// values is kept and empty values are written as `""`. Values holding a
/// comma or a stray parenthesis are quoted so they stay one option;
/// parenthesised lists like `(Steam,Xbox)` are written as they are. Keys
/// absent from the file are appended to the end of the option list. Every
/// other byte is left untouched.
pub fn apply_changes(
    original: &str,
    changes: &IndexMap<String, String>,
) -> Result<String, CoreError> {
    if let Some((key, value)) = changes.iter().find(|(_, v)| v.contains('"')) {
        return Err(CoreError::Validation {
            message: format!("{key} = {value}: values cannot contain double quotes"),
        });
    }

    let span = option_span(original)?;
    let pairs = split_pairs(original, span.clone());

    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    for pair in &pairs {
        let Some(new_value) = changes.get(pair.key) else {
            continue;
        };
        let raw = &original[pair.value.clone()];
        if unquote(raw) == new_value {
            continue;
        }
        let quote = is_quoted(raw) || new_value.is_empty() || needs_quotes(new_value);
        let replacement = if quote {
            format!("\"{new_value}\"")
        } else {
            new_value.clone()
        };
        edits.push((pair.value.clone(), replacement));
    }

    let appended: Vec<String> = changes
        .iter()
        .filter(|(k, _)| !pairs.iter().any(|p| p.key == k.as_str()))
        .map(|(k, v)| format!("{k}={}", format_new_value(k, v)))
        .collect();

    let mut out = String::with_capacity(original.len() + 64);
    let mut cursor = 0;
    for (range, replacement) in edits {
        out.push_str(&original[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&original[cursor..span.end]);
    if !appended.is_empty() {
        if !original[span.clone()].trim().is_empty() {
            out.push(',');
        }
        out.push_str(&appended.join(","));
    }
    out.push_str(&original[span.end..]);
    Ok(out)
}

// ── Tokenizer ────────────────────────────────────────────────────

struct Pair<'a> {
    key: &'a str,
    /// Trimmed value bytes within the source.
    value: Range<usize>,
}

/// Byte range between the parentheses of `OptionSettings=(...)`.
fn option_span(content: &str) -> Result<Range<usize>, CoreError> {
    let start = content
        .find(OPTION_PREFIX)
        .map(|i| i + OPTION_PREFIX.len())
        .ok_or_else(|| CoreError::Settings {
            message: "OptionSettings line not found".into(),
        })?;

    let mut depth = 1usize;
    let mut in_quotes = false;
    for (offset, c) in content[start..].char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth -= 1;
                if depth == 0 {
                    return Ok(start..start + offset);
                }
            }
            _ => {}
        }
    }

    Err(CoreError::Settings {
        message: "OptionSettings is missing its closing parenthesis".into(),
    })
}

/// Split on commas outside quotes and nested parentheses.
fn split_pairs(content: &str, span: Range<usize>) -> Vec<Pair<'_>> {
    let mut segments = Vec::new();
    let mut seg_start = span.start;
    let mut depth = 0usize;
    let mut in_quotes = false;

    for (offset, c) in content[span.clone()].char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => depth = depth.saturating_sub(1),
            ',' if !in_quotes && depth == 0 => {
                segments.push(seg_start..span.start + offset);
                seg_start = span.start + offset + 1;
            }
            _ => {}
        }
    }
    segments.push(seg_start..span.end);

    segments
        .into_iter()
        .filter_map(|seg| {
            let text = &content[seg.clone()];
            let eq = text.find('=')?;
            let key = text[..eq].trim();
            if key.is_empty() {
                return None;
            }
            let raw_value = &text[eq + 1..];
            let lead = raw_value.len() - raw_value.trim_start().len();
            let value_start = seg.start + eq + 1 + lead;
            let value_end = value_start + raw_value.trim().len();
            Some(Pair {
                key,
                value: value_start..value_end,
            })
        })
        .collect()
}

fn is_quoted(raw: &str) -> bool {
    raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"')
}

fn unquote(raw: &str) -> &str {
    if is_quoted(raw) {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

/// Quoting for values that have no existing formatting to follow.
fn format_new_value(key: &str, value: &str) -> String {
    let is_text = field(key).is_none_or(|f| f.kind == FieldKind::Text);
    if value.is_empty() || needs_quotes(value) || (is_text && !is_list(value)) {
        format!("\"{value}\"")
    } else {
        value.to_owned()
    }
}

/// A bare value containing these would split or unbalance the option list.
fn needs_quotes(value: &str) -> bool {
    !is_list(value) && value.contains([',', '(', ')'])
}

/// `(a,b,...)` with balanced parentheses, closed only by its last byte.
fn is_list(value: &str) -> bool {
    if !value.starts_with('(') || !value.ends_with(')') {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i + 1 != value.len() {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = "[/Script/Pal.PalGameWorldSettings]\r\n\
OptionSettings=(Difficulty=None,DayTimeSpeedRate=1.000000,ServerName=\"Pal, Island\",\
CrossplayPlatforms=(Steam,Xbox,PS5,Mac),AdminPassword=\"\",bHardcore=False)\r\n";

    #[test]
    fn parse_respects_quotes_and_parentheses() {
        let s = WorldSettings::parse(SAMPLE).unwrap();
        assert_eq!(s.len(), 6);
        assert_eq!(s.get("ServerName"), Some("Pal, Island"));
        assert_eq!(s.get("CrossplayPlatforms"), Some("(Steam,Xbox,PS5,Mac)"));
        assert_eq!(s.get("AdminPassword"), Some(""));
        let keys: Vec<_> = s.iter().map(|(k, _)| k).collect();
        assert_eq!(keys[0], "Difficulty");
        assert_eq!(keys[5], "bHardcore");
    }

    #[test]
    fn parse_without_option_line_fails() {
        let err = WorldSettings::parse("[/Script/Pal.PalGameWorldSettings]\n").unwrap_err();
        assert!(matches!(err, CoreError::Settings { .. }));
    }

    #[test]
    fn apply_without_changes_is_identity() {
        let mut changes = IndexMap::new();
        changes.insert("Difficulty".to_string(), "None".to_string());
        assert_eq!(apply_changes(SAMPLE, &changes).unwrap(), SAMPLE);
    }

    #[test]
    fn apply_preserves_quoting_and_layout() {
        let mut changes = IndexMap::new();
        changes.insert("ServerName".to_string(), "New Name".to_string());
        changes.insert("ExpRate".to_string(), "2.000000".to_string());
        changes.insert("bHardcore".to_string(), "True".to_string());
        changes.insert("Difficulty".to_string(), String::new());

        let out = apply_changes(SAMPLE, &changes).unwrap();
        assert_eq!(
            out,
            "[/Script/Pal.PalGameWorldSettings]\r\n\
OptionSettings=(Difficulty=\"\",DayTimeSpeedRate=1.000000,ServerName=\"New Name\",\
CrossplayPlatforms=(Steam,Xbox,PS5,Mac),AdminPassword=\"\",bHardcore=True,ExpRate=2.000000)\r\n"
        );

        let reparsed = WorldSettings::parse(&out).unwrap();
        assert_eq!(reparsed.get("ServerName"), Some("New Name"));
        assert_eq!(reparsed.get("CrossplayPlatforms"), Some("(Steam,Xbox,PS5,Mac)"));
    }

    #[test]
    fn apply_quotes_values_that_would_split_the_list() {
        let original = "OptionSettings=(AllowConnectPlatform=Steam,bHardcore=False)\r\n";
        let mut changes = IndexMap::new();
        changes.insert("AllowConnectPlatform".to_string(), "Steam,Xbox".to_string());
        changes.insert("BanListURL".to_string(), "https://x.test/list(1)".to_string());

        let out = apply_changes(original, &changes).unwrap();
        assert_eq!(
            out,
            "OptionSettings=(AllowConnectPlatform=\"Steam,Xbox\",bHardcore=False,\
BanListURL=\"https://x.test/list(1)\")\r\n"
        );

        let reparsed = WorldSettings::parse(&out).unwrap();
        assert_eq!(reparsed.len(), 3);
        assert_eq!(reparsed.get("AllowConnectPlatform"), Some("Steam,Xbox"));
        assert_eq!(reparsed.get("bHardcore"), Some("False"));
        assert_eq!(reparsed.get("BanListURL"), Some("https://x.test/list(1)"));
    }

    #[test]
    fn apply_writes_parenthesised_lists_bare() {
        let mut changes = IndexMap::new();
        changes.insert("CrossplayPlatforms".to_string(), "(Steam,Xbox)".to_string());
        changes.insert("bHardcore".to_string(), "(True".to_string());

        let out = apply_changes(SAMPLE, &changes).unwrap();
        assert!(out.contains("CrossplayPlatforms=(Steam,Xbox),"));
        assert!(out.contains("bHardcore=\"(True\")"));

        let reparsed = WorldSettings::parse(&out).unwrap();
        assert_eq!(reparsed.len(), 6);
        assert_eq!(reparsed.get("CrossplayPlatforms"), Some("(Steam,Xbox)"));
        assert_eq!(reparsed.get("bHardcore"), Some("(True"));
    }

    #[test]
    fn apply_rejects_embedded_quotes() {
        let mut changes = IndexMap::new();
        changes.insert("ServerName".to_string(), "The \"Best\" Server".to_string());
        let err = apply_changes(SAMPLE, &changes).unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn validate_reports_every_bad_field() {
        let mut s = WorldSettings::defaults();
        assert!(s.validate().is_empty());

        s.set("bHardcore", "maybe");
        s.set("ExpRate", "fast");
        s.set("Difficulty", "Nightmare");
        s.set("SomeFutureKey", "anything");

        let issues = s.validate();
        let keys: Vec<_> = issues.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["Difficulty", "ExpRate", "bHardcore"]);
        assert_eq!(
            issues[0].to_string(),
            "Difficulty = \"Nightmare\": expected one of None, Easy, Normal, Hard"
        );
    }

    #[test]
    fn defaults_render_to_parseable_ini() {
        let defaults = WorldSettings::defaults();
        let ini = defaults.to_ini();
        assert!(ini.contains("ServerName=\"PalWorld Server\""));
        assert!(ini.contains("CrossplayPlatforms=(Steam,Xbox,PS5,Mac)"));
        assert_eq!(WorldSettings::parse(&ini).unwrap(), defaults);
    }

    #[test]
    fn changes_to_lists_differences() {
        let base = WorldSettings::parse(SAMPLE).unwrap();
        let mut edited = base.clone();
        edited.set("bHardcore", "True");
        let changes = base.changes_to(&edited);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get("bHardcore").map(String::as_str), Some("True"));
    }
}
