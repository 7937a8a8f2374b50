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

use lazy_static::lazy_static;
use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType, Description, Schema};
use tf_provider::{AttributePath, Diagnostics};

mod convert;
mod path_search;
mod timeouts;

pub use convert::{
    assign_string, bool_at, expand_resource_tags, flatten_tags_to_map, format_rfc3339, number_at,
    remove_nil, string_at, string_list_at, value_ignore_empty, ToJson,
};
pub use path_search::PathSearch;
pub use timeouts::{parse_duration, TimeoutKind, Timeouts, WithTimeouts, TIMEOUTS_BLOCK};

lazy_static! {
    pub(crate) static ref REGION_ATTRIBUTE: Attribute = Attribute {
        attr_type: AttributeType::String,
        description: Description::plain(
            "The region in which to create the resource, defaults to the provider region",
        ),
        constraint: AttributeConstraint::OptionalComputed,
        ..Default::default()
    };
    pub(crate) static ref ID_ATTRIBUTE: Attribute = Attribute {
        attr_type: AttributeType::String,
        description: Description::plain("The resource ID"),
        constraint: AttributeConstraint::Computed,
        ..Default::default()
    };
    pub(crate) static ref TAGS_ATTRIBUTE: Attribute = Attribute {
        attr_type: AttributeType::Map(AttributeType::String.into()),
        description: Description::plain("The key/value pairs to associate with the resource"),
        constraint: AttributeConstraint::OptionalComputed,
        ..Default::default()
    };
}

/// Output-only attribute
pub(crate) fn computed(attr_type: AttributeType, description: &str) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint: AttributeConstraint::Computed,
        ..Default::default()
    }
}

pub(crate) trait WithSchema {
    fn schema() -> Schema;
}

pub(crate) trait WithValidate {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath);
}

/// Report the error of a fallible operation into the diagnostics
pub(crate) trait ReportError<T> {
    fn or_report<S>(self, diags: &mut Diagnostics, summary: S) -> Option<T>
    where
        S: Into<Cow<'static, str>>;
}

impl<T, E> ReportError<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn or_report<S>(self, diags: &mut Diagnostics, summary: S) -> Option<T>
    where
        S: Into<Cow<'static, str>>,
    {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                let err: anyhow::Error = err.into();
                let summary = summary.into();
                tracing::error!("{summary}: {err:#}");
                diags.root_error(summary, format!("{err:#}"));
                None
            }
        }
    }
}

/// List the fields whose values differ between two states
macro_rules! changed_attributes {
    ($prior:expr, $proposed:expr, [$($field:ident),* $(,)?]) => {{
        let mut changed: Vec<&'static str> = Vec::new();
        $(
            if $prior.$field != $proposed.$field {
                changed.push(stringify!($field));
            }
        )*
        changed
    }};
}
pub(crate) use changed_attributes;

/// Replace the unknown values left in the given fields with nulls
macro_rules! settle_unknowns {
    ($state:expr, [$($field:ident),* $(,)?]) => {
        $(
            if $state.$field.is_unknown() {
                $state.$field = Default::default();
            }
        )*
    };
}
pub(crate) use settle_unknowns;

/// Attribute paths of the changed fields that cannot be updated in place
pub(crate) fn replace_triggers(changed: &[&'static str], force_new: &[&str]) -> Vec<AttributePath> {
    changed
        .iter()
        .filter(|name| force_new.contains(name))
        .map(|name| AttributePath::new(*name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample {
        name: &'static str,
        size: i64,
        flag: bool,
    }

    #[test]
    fn test_changed_attributes() {
        let prior = Sample {
            name: "a",
            size: 1,
            flag: false,
        };
        let proposed = Sample {
            name: "b",
            size: 1,
            flag: true,
        };
        let changed = changed_attributes!(prior, proposed, [name, size, flag]);
        assert_eq!(changed, vec!["name", "flag"]);
        assert_eq!(replace_triggers(&changed, &["name", "size"]).len(), 1);
        assert!(changed_attributes!(prior, prior, [name, size, flag]).is_empty());
    }

    #[test]
    fn test_settle_unknowns() {
        struct Planned {
            status: tf_provider::value::ValueString<'static>,
            port: tf_provider::value::ValueNumber,
        }
        let mut planned = Planned {
            status: tf_provider::value::Value::Unknown,
            port: tf_provider::value::Value::Value(8000),
        };
        settle_unknowns!(planned, [status, port]);
        assert!(planned.status.is_null());
        assert_eq!(planned.port.as_option(), Some(8000));
    }

    #[test]
    fn test_or_report() {
        let mut diags = Diagnostics::default();
        let ok: Result<i32, anyhow::Error> = Ok(3);
        assert_eq!(ok.or_report(&mut diags, "unused"), Some(3));
        assert!(diags.errors.is_empty());

        let err: Result<i32, anyhow::Error> = Err(anyhow::anyhow!("boom"));
        assert_eq!(err.or_report(&mut diags, "error reading"), None);
        assert_eq!(diags.errors.len(), 1);
    }
}
