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

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, NestedBlock,
};
use tf_provider::value::{Value, ValueString};
use tf_provider::{map, AttributePath, Diagnostics};

use super::WithValidate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Timeouts<'a> {
    #[serde(borrow = "'a")]
    pub create: ValueString<'a>,
    pub update: ValueString<'a>,
    pub delete: ValueString<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    Create,
    Update,
    Delete,
}

impl TimeoutKind {
    const ALL: [TimeoutKind; 3] = [TimeoutKind::Create, TimeoutKind::Update, TimeoutKind::Delete];

    fn name(self) -> &'static str {
        match self {
            TimeoutKind::Create => "create",
            TimeoutKind::Update => "update",
            TimeoutKind::Delete => "delete",
        }
    }
}

impl<'a> Timeouts<'a> {
    fn get(&self, kind: TimeoutKind) -> &ValueString<'a> {
        match kind {
            TimeoutKind::Create => &self.create,
            TimeoutKind::Update => &self.update,
            TimeoutKind::Delete => &self.delete,
        }
    }
}

impl WithValidate for Timeouts<'_> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        for kind in TimeoutKind::ALL {
            if let Some(raw) = self.get(kind).as_deref_option() {
                if let Err(err) = parse_duration(raw) {
                    diags.error(
                        "Invalid timeout",
                        err.to_string(),
                        attr_path.clone().attribute(kind.name()),
                    );
                }
            }
        }
    }
}

impl<T: WithValidate> WithValidate for Value<T> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(inner) = self {
            inner.validate(diags, attr_path);
        }
    }
}

pub trait WithTimeouts {
    /// Configured timeout of an operation, or `default` when unset
    fn timeout(&self, kind: TimeoutKind, default: Duration) -> Duration;
}

impl WithTimeouts for Value<Timeouts<'_>> {
    fn timeout(&self, kind: TimeoutKind, default: Duration) -> Duration {
        self.as_ref_option()
            .and_then(|timeouts| timeouts.get(kind).as_deref_option())
            .and_then(|raw| parse_duration(raw).ok())
            .unwrap_or(default)
    }
}

/// Nanoseconds per duration unit
const UNITS: [(&str, u64); 8] = [
    ("ns", 1),
    ("us", 1_000),
    ("\u{b5}s", 1_000),
    ("\u{3bc}s", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Longest accepted duration, matching a signed 64-bit nanosecond count
const MAX_NANOS: u64 = i64::MAX as u64;

/// Parse a Terraform duration string such as `"1h30m"`, `"1.5h"` or `"500ms"`
pub fn parse_duration(input: &str) -> Result<Duration> {
    let mut rest = input.trim();
    if let Some(unsigned) = rest.strip_prefix('+') {
        rest = unsigned;
    } else if rest.starts_with('-') && rest != "-0" {
        bail!("invalid duration '{input}': negative duration");
    } else if let Some(unsigned) = rest.strip_prefix('-') {
        rest = unsigned;
    }
    if rest.is_empty() {
        bail!("invalid duration '{input}': empty string");
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total: u64 = 0;
    while !rest.is_empty() {
        let (integer, tail) = split_digits(rest);
        let (fraction, tail) = match tail.strip_prefix('.') {
            Some(tail) => split_digits(tail),
            None => ("", tail),
        };
        if integer.is_empty() && fraction.is_empty() {
            bail!("invalid duration '{input}': expected a number");
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let Some(&(_, scale)) = UNITS.iter().find(|(name, _)| *name == unit) else {
            if unit.is_empty() {
                bail!("invalid duration '{input}': missing unit");
            }
            bail!("invalid duration '{input}': unknown unit '{unit}'");
        };

        total = scaled(integer, fraction, scale)
            .and_then(|nanos| total.checked_add(nanos))
            .filter(|total| *total <= MAX_NANOS)
            .ok_or_else(|| anyhow!("invalid duration '{input}': overflow"))?;
        rest = tail;
    }

    Ok(Duration::from_nanos(total))
}

fn split_digits(input: &str) -> (&str, &str) {
    let len = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    input.split_at(len)
}

/// `integer.fraction` units of `scale` nanoseconds, sub-nanosecond digits are dropped
fn scaled(integer: &str, fraction: &str, scale: u64) -> Option<u64> {
    let whole: u64 = if integer.is_empty() {
        0
    } else {
        integer.parse().ok()?
    };
    let mut nanos = whole.checked_mul(scale)?;
    let mut digit_scale = scale;
    for digit in fraction.bytes() {
        digit_scale /= 10;
        if digit_scale == 0 {
            break;
        }
        nanos = nanos.checked_add(u64::from(digit - b'0') * digit_scale)?;
    }
    Some(nanos)
}

lazy_static! {
    pub static ref TIMEOUTS_BLOCK: NestedBlock = NestedBlock::Optional(Block {
        attributes: map! {
            "create" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("Timeout of the create operation (e.g. \"60m\")"),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
            "update" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("Timeout of the update operation"),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
            "delete" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("Timeout of the delete operation"),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
        },
        description: Description::plain("Operation timeouts"),
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("60m").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("1m500ms").unwrap(), Duration::from_millis(60_500));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("3d").is_err());
    }

    #[test]
    fn test_parse_duration_fractions_and_units() {
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration(".5m").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("2.25s").unwrap(), Duration::from_millis(2250));
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("10\u{b5}s").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("10\u{3bc}s").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("1.9ns").unwrap(), Duration::from_nanos(1));
        assert_eq!(parse_duration("1h0.5m15s").unwrap(), Duration::from_secs(3645));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("+45s").unwrap(), Duration::from_secs(45));
        assert!(parse_duration(".h").is_err());
        assert!(parse_duration("-5m").is_err());
    }

    #[test]
    fn test_parse_duration_overflow() {
        let err = parse_duration("99999999999999999h").unwrap_err();
        assert_eq!(err.to_string(), "invalid duration '99999999999999999h': overflow");
        assert!(parse_duration("2562047h48m").is_err());
        assert!(parse_duration("2562047h").is_ok());
        assert!(parse_duration("99999999999999999999999s").is_err());
        assert!(parse_duration("2562047h2562047h").is_err());
    }

    #[test]
    fn test_timeout_fallback() {
        let default = Duration::from_secs(600);
        let timeouts: Value<Timeouts> = Value::Value(Timeouts {
            create: ValueString::from("2h"),
            update: ValueString::from("bogus"),
            delete: ValueString::Null,
        });
        assert_eq!(
            timeouts.timeout(TimeoutKind::Create, default),
            Duration::from_secs(7200)
        );
        assert_eq!(timeouts.timeout(TimeoutKind::Update, default), default);
        assert_eq!(timeouts.timeout(TimeoutKind::Delete, default), default);
        assert_eq!(
            Value::<Timeouts>::Null.timeout(TimeoutKind::Create, default),
            default
        );
    }

    #[test]
    fn test_validate() {
        let mut diags = Diagnostics::default();
        let timeouts = Timeouts {
            create: ValueString::from("30x"),
            ..Default::default()
        };
        timeouts.validate(&mut diags, AttributePath::new("timeouts"));
        assert_eq!(diags.errors.len(), 1);
    }
}
