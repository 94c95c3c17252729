//! Compact string forms of the data model.
//!
//! | entity            | form                                   |
//! |-------------------|----------------------------------------|
//! | item in batch     | `3xapple`                              |
//! | batch             | `batch 1: 10; 3xapple, 2xbanana`       |
//! | seller's batch    | `seller 1_batch 1: 10; 3xapple`        |
//! | item request      | `1-2 of apple`, `1-inf of apple`, `1 of apple` |

use std::str::FromStr;

use indexmap::IndexMap;
use thiserror::Error;

use crate::model::{Batch, BatchCollection, BatchLists, DemandList, ItemInBatch, ItemRequest, ModelError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Expected '{separator}' in '{input}'")]
    MissingSeparator { input: String, separator: &'static str },
    #[error("Invalid number '{value}' in '{input}'")]
    InvalidNumber { input: String, value: String },
    #[error("Empty name in '{0}'")]
    EmptyName(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

fn split_once<'a>(input: &'a str, separator: &'static str) -> Result<(&'a str, &'a str), ParseError> {
    input.split_once(separator).ok_or_else(|| ParseError::MissingSeparator {
        input: input.to_string(),
        separator,
    })
}

fn number(value: &str, input: &str) -> Result<f64, ParseError> {
    value.trim().parse::<f64>().map_err(|_| ParseError::InvalidNumber {
        input: input.to_string(),
        value: value.trim().to_string(),
    })
}

fn name(value: &str, input: &str) -> Result<String, ParseError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ParseError::EmptyName(input.to_string()));
    }
    Ok(value.to_string())
}

impl FromStr for ItemInBatch {
    type Err = ParseError;

    /// `"3xapple"`: the quantity is everything before the first `x`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (quantity, item) = split_once(s, "x")?;
        Ok(ItemInBatch::new(name(item, s)?, number(quantity, s)?)?)
    }
}

impl FromStr for Batch {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, items) = split_once(s, ";")?;
        let (batch_name, price) = split_once(head, ":")?;

        let items = items
            .split(',')
            .filter(|fragment| !fragment.trim().is_empty())
            .map(|fragment| fragment.trim().parse::<ItemInBatch>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Batch::new(name(batch_name, s)?, number(price, s)?, items)?)
    }
}

impl FromStr for ItemRequest {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (quantities, item) = split_once(s, " of ")?;
        let (minimum, maximum) = match quantities.split_once('-') {
            Some((minimum, maximum)) => (number(minimum, s)?, Some(number(maximum, s)?)),
            None => (number(quantities, s)?, None),
        };
        Ok(ItemRequest::new(name(item, s)?, minimum, maximum)?)
    }
}

impl BatchCollection {
    /// Parse one batch per string, all offered by `seller`
    pub fn parse<S: AsRef<str>>(seller: &str, batches: &[S]) -> Result<Self, ParseError> {
        let batches = batches
            .iter()
            .map(|s| s.as_ref().parse::<Batch>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BatchCollection::new(seller, batches)?)
    }
}

impl BatchLists {
    /// Parse `"seller_batch: price; items"` strings, grouping them by seller
    pub fn parse<S: AsRef<str>>(batches: &[S]) -> Result<Self, ParseError> {
        let mut by_seller: IndexMap<String, Vec<Batch>> = IndexMap::new();
        for s in batches {
            let s = s.as_ref();
            let (seller, batch) = split_once(s, "_")?;
            by_seller
                .entry(name(seller, s)?)
                .or_default()
                .push(batch.parse()?);
        }

        let collections = by_seller
            .into_iter()
            .map(|(seller, batches)| BatchCollection::new(seller, batches))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BatchLists::new(collections)?)
    }
}

impl DemandList {
    pub fn parse<S: AsRef<str>>(requests: &[S]) -> Result<Self, ParseError> {
        let items = requests
            .iter()
            .map(|s| s.as_ref().parse::<ItemRequest>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DemandList::new(items)?)
    }
}
