// This file is part of the terraform-provider-huaweicloud project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value as Json};
use tf_provider::value::{Value, ValueBool, ValueList, ValueMap, ValueNumber, ValueString};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use super::PathSearch;

/// Conversion of Terraform values into request body fragments
pub trait ToJson {
    fn to_json(&self) -> Json;
}

impl<T: Serialize> ToJson for Value<T> {
    fn to_json(&self) -> Json {
        match self {
            Value::Value(value) => serde_json::to_value(value).unwrap_or(Json::Null),
            Value::Null | Value::Unknown => Json::Null,
        }
    }
}

/// Recursively drop `null` members of objects
pub fn remove_nil(value: Json) -> Json {
    match value {
        Json::Object(object) => Json::Object(
            object
                .into_iter()
                .filter_map(|(key, value)| match remove_nil(value) {
                    Json::Null => None,
                    value => Some((key, value)),
                })
                .collect(),
        ),
        Json::Array(items) => Json::Array(items.into_iter().map(remove_nil).collect()),
        value => value,
    }
}

/// Map zero values (`""`, `0`, `false`, empty collections) to `null`
pub fn value_ignore_empty(value: Json) -> Json {
    let empty = match &value {
        Json::Null => true,
        Json::Bool(b) => !b,
        Json::Number(n) => n.as_f64() == Some(0.0),
        Json::String(s) => s.is_empty(),
        Json::Array(a) => a.is_empty(),
        Json::Object(o) => o.is_empty(),
    };
    if empty {
        Json::Null
    } else {
        value
    }
}

/// Tags map into the `[{"key": .., "value": ..}]` form of the API
pub fn expand_resource_tags(tags: &ValueMap<'_, ValueString<'_>>) -> Json {
    Json::Array(
        tags.iter()
            .flatten()
            .filter_map(|(key, value)| {
                Some(json!({
                    "key": key,
                    "value": value.as_deref_option()?,
                }))
            })
            .collect(),
    )
}

pub fn flatten_tags_to_map<'a>(tags: Option<Json>) -> ValueMap<'a, ValueString<'a>> {
    let tags = tags
        .as_ref()
        .and_then(Json::as_array)
        .into_iter()
        .flatten()
        .filter_map(|tag| {
            let key = tag.get("key")?.as_str()?;
            let value = tag.get("value").and_then(Json::as_str).unwrap_or_default();
            Some((
                Cow::Owned(key.to_owned()),
                Value::Value(Cow::Owned(value.to_owned())),
            ))
        })
        .collect::<BTreeMap<_, _>>();

    if tags.is_empty() {
        Value::Null
    } else {
        Value::Value(tags)
    }
}

/// Format a millisecond timestamp or a date string as RFC3339 in UTC
pub fn format_rfc3339(value: &Json) -> Option<String> {
    let datetime = match value {
        Json::Number(n) => {
            let ms = n.as_i64()?;
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()?
        }
        Json::String(s) if !s.is_empty() => match OffsetDateTime::parse(s, &Rfc3339) {
            Ok(datetime) => datetime,
            Err(_) => PrimitiveDateTime::parse(
                s.trim_end_matches('Z'),
                format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
                ),
            )
            .ok()?
            .assume_utc(),
        },
        _ => return None,
    };

    datetime
        .to_offset(UtcOffset::UTC)
        .replace_nanosecond(0)
        .ok()?
        .format(&Rfc3339)
        .ok()
}

/// String found at `expr`, numbers and booleans are rendered as strings
pub fn string_at<'a>(body: &Json, expr: &str) -> ValueString<'a> {
    match body.search(expr) {
        Some(Json::String(s)) => Value::Value(Cow::Owned(s)),
        Some(value @ (Json::Number(_) | Json::Bool(_))) => {
            Value::Value(Cow::Owned(value.to_string()))
        }
        _ => Value::Null,
    }
}

/// Assign a string read from the API, `null` and `""` being equivalent
///
/// An attribute left unset (or set empty) keeps its value when the API
/// reports the other form of emptiness.
pub fn assign_string<'a>(current: &mut ValueString<'a>, remote: ValueString<'a>) {
    let is_empty = |value: &ValueString| value.as_deref_option().unwrap_or_default().is_empty();
    if !(is_empty(current) && is_empty(&remote)) || current.is_unknown() {
        *current = remote;
    }
}

pub fn number_at(body: &Json, expr: &str) -> ValueNumber {
    body.search_i64(expr).into()
}

pub fn bool_at(body: &Json, expr: &str) -> ValueBool {
    body.search_bool(expr).into()
}

pub fn string_list_at<'a>(body: &Json, expr: &str) -> ValueList<ValueString<'a>> {
    match body.search(expr) {
        Some(Json::Array(items)) => Value::Value(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Json::String(s) => Some(Value::Value(Cow::Owned(s))),
                    _ => None,
                })
                .collect(),
        ),
        _ => Value::Null,
    }
}
