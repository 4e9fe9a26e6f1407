//! Typed views over the API's `results` envelopes.
//!
//! Only the fields the crate uses are modelled; everything else in the
//! payload is ignored. Decoding is lenient: a missing field, an explicit
//! `null` or a value of the wrong scalar type falls back to the default, so
//! one odd field never discards an otherwise usable response.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::pages::OrderedPage;

/// A named reference (author, theme) as the API nests them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedRef {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub path_word: String,
}

/// Core comic metadata from the details endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComicInfo {
    #[serde(deserialize_with = "lenient_string")]
    pub uuid: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub path_word: String,
    #[serde(deserialize_with = "lenient_string")]
    pub cover: String,
    #[serde(deserialize_with = "lenient_string")]
    pub brief: String,
    #[serde(deserialize_with = "lenient_refs")]
    pub author: Vec<NamedRef>,
    #[serde(deserialize_with = "lenient_refs")]
    pub theme: Vec<NamedRef>,
    #[serde(deserialize_with = "optional_string")]
    pub datetime_updated: Option<String>,
}

/// A chapter group ("default", "tankobon", ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterGroup {
    #[serde(deserialize_with = "lenient_string")]
    pub path_word: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_u64")]
    pub count: u64,
}

/// `results` of the details endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComicDetails {
    #[serde(deserialize_with = "null_as_default")]
    pub comic: ComicInfo,
    #[serde(deserialize_with = "deserialize_groups")]
    pub groups: Vec<ChapterGroup>,
}

impl ComicDetails {
    /// Group path words. Array-form groups keep the API's order; map-form
    /// groups come back sorted by key.
    pub fn group_path_words(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .map(|group| group.path_word.as_str())
            .filter(|word| !word.is_empty())
    }
}

/// One entry of a chapter listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chapter {
    #[serde(deserialize_with = "lenient_string")]
    pub uuid: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_u64")]
    pub index: u64,
    #[serde(deserialize_with = "lenient_string")]
    pub comic_path_word: String,
    #[serde(deserialize_with = "lenient_string")]
    pub group_path_word: String,
    #[serde(deserialize_with = "lenient_u64")]
    pub size: u64,
    #[serde(deserialize_with = "optional_string")]
    pub datetime_created: Option<String>,
}

/// `results` of one chapter listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct ChapterListPage {
    #[serde(deserialize_with = "null_as_default")]
    pub list: Vec<Chapter>,
    #[serde(deserialize_with = "lenient_u64")]
    pub total: u64,
}

/// `results.chapter` of the pages endpoint, before ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct RawChapter {
    #[serde(deserialize_with = "lenient_string")]
    pub uuid: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_contents")]
    pub contents: Vec<RawContent>,
    /// Empty when the ordering array is absent or not all integers.
    #[serde(deserialize_with = "lenient_ordering")]
    pub words: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct RawContent {
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
}

/// A chapter's pages in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChapterPages {
    pub uuid: String,
    pub name: String,
    pub pages: Vec<OrderedPage>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_string(Value::deserialize(deserializer)?))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_string(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn scalar_string(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_u64().unwrap_or_default(),
        Value::String(text) => text.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

fn lenient_refs<'de, D>(deserializer: D) -> Result<Vec<NamedRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(array_items(Value::deserialize(deserializer)?)
        .into_iter()
        .filter_map(|item| NamedRef::deserialize(item).ok())
        .collect())
}

/// Malformed entries become empty-URL pages so indices stay aligned with `words`.
fn lenient_contents<'de, D>(deserializer: D) -> Result<Vec<RawContent>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(array_items(Value::deserialize(deserializer)?)
        .into_iter()
        .map(|item| match item {
            Value::String(url) => RawContent { url },
            other => RawContent::deserialize(other).unwrap_or_default(),
        })
        .collect())
}

/// Any non-integer entry discards the whole ordering array.
fn lenient_ordering<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = array_items(Value::deserialize(deserializer)?);
    Ok(items
        .iter()
        .map(Value::as_i64)
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default())
}

fn array_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Accepts `groups` as either `{"default": {...}}` or `[{...}]`.
///
/// For the map form the key doubles as the path word when the entry omits it.
/// Entries that are not objects are skipped.
fn deserialize_groups<'de, D>(deserializer: D) -> Result<Vec<ChapterGroup>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Vec<(Option<String>, Value)> = match Value::deserialize(deserializer)? {
        Value::Object(map) => map.into_iter().map(|(key, value)| (Some(key), value)).collect(),
        Value::Array(items) => items.into_iter().map(|value| (None, value)).collect(),
        _ => Vec::new(),
    };

    Ok(entries
        .into_iter()
        .filter(|(_, value)| value.is_object())
        .filter_map(|(key, value)| {
            let mut group = ChapterGroup::deserialize(value).ok()?;
            if group.path_word.is_empty() {
                group.path_word = key.unwrap_or_default();
            }
            Some(group)
        })
        .collect())
}
