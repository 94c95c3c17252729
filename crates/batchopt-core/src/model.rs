use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

pub const DEFAULT_SELLER: &str = "Default seller";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("The price of batch '{batch}' is {price}, it must be positive or zero")]
    NegativePrice { batch: String, price: f64 },
    #[error("The quantity of item '{item}' is {quantity}, it must be positive or zero")]
    NegativeQuantity { item: String, quantity: f64 },
    #[error("Item '{item}' appears more than once in batch '{batch}'")]
    DuplicateItem { batch: String, item: String },
    #[error("The name of the batch '{0}' is not unique")]
    DuplicateBatch(String),
    #[error("Item '{0}' is requested more than once")]
    DuplicateRequest(String),
    #[error("The minimum quantity {minimum} of '{item}' is greater than its maximum quantity {maximum}")]
    MinimumAboveMaximum { item: String, minimum: f64, maximum: f64 },
    #[error("Batches of sellers '{first}' and '{second}' are both named '{name}' once prefixed by their seller")]
    PrefixedNameClash { name: String, first: String, second: String },
}

/// An item and its quantity inside a batch
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ItemInBatch {
    pub name: String,
    pub quantity_in_batch: f64,
}

impl ItemInBatch {
    pub fn new(name: impl Into<String>, quantity_in_batch: f64) -> Result<Self, ModelError> {
        let item = Self {
            name: name.into(),
            quantity_in_batch,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        // written so that NaN is rejected as well
        if !(self.quantity_in_batch >= 0.0) {
            return Err(ModelError::NegativeQuantity {
                item: self.name.clone(),
                quantity: self.quantity_in_batch,
            });
        }
        Ok(())
    }
}

/// A priced bundle of items in fixed proportions
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub name: String,
    pub price: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub items: Vec<ItemInBatch>,
}

impl Batch {
    pub fn new(name: impl Into<String>, price: f64, items: Vec<ItemInBatch>) -> Result<Self, ModelError> {
        let batch = Self {
            name: name.into(),
            price,
            items,
        };
        batch.validate()?;
        Ok(batch)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.price >= 0.0) {
            return Err(ModelError::NegativePrice {
                batch: self.name.clone(),
                price: self.price,
            });
        }
        let mut seen = IndexSet::new();
        for item in &self.items {
            item.validate()?;
            if !seen.insert(item.name.as_str()) {
                return Err(ModelError::DuplicateItem {
                    batch: self.name.clone(),
                    item: item.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Quantity of `item` in this batch, if the batch lists it
    pub fn quantity_of(&self, item: &str) -> Option<f64> {
        self.items
            .iter()
            .find(|i| i.name == item)
            .map(|i| i.quantity_in_batch)
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|i| i.name == item)
    }
}

/// The batches offered by one seller.
///
/// On construction every batch is padded with zero quantities so that all
/// batches list the same items, and items that are zero everywhere are
/// dropped.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "BatchCollectionData"))]
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCollection {
    seller: String,
    #[cfg_attr(feature = "serde", serde(rename = "batch_list"))]
    batches: Vec<Batch>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct BatchCollectionData {
    #[serde(default = "default_seller")]
    seller: String,
    batch_list: Vec<Batch>,
}

#[cfg(feature = "serde")]
fn default_seller() -> String {
    DEFAULT_SELLER.to_string()
}

#[cfg(feature = "serde")]
impl TryFrom<BatchCollectionData> for BatchCollection {
    type Error = ModelError;

    fn try_from(data: BatchCollectionData) -> Result<Self, Self::Error> {
        Self::new(data.seller, data.batch_list)
    }
}

impl BatchCollection {
    pub fn new(seller: impl Into<String>, batches: Vec<Batch>) -> Result<Self, ModelError> {
        let mut seen = IndexSet::new();
        for batch in &batches {
            batch.validate()?;
            if !seen.insert(batch.name.as_str()) {
                return Err(ModelError::DuplicateBatch(batch.name.clone()));
            }
        }

        let mut collection = Self {
            seller: seller.into(),
            batches,
        };
        collection.pad_items();
        collection.drop_empty_items();
        Ok(collection)
    }

    /// A collection attributed to [`DEFAULT_SELLER`]
    pub fn from_batches(batches: Vec<Batch>) -> Result<Self, ModelError> {
        Self::new(DEFAULT_SELLER, batches)
    }

    pub fn seller(&self) -> &str {
        &self.seller
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Batch> {
        self.batches.iter()
    }

    /// Mutable access to the batches. Only prices may be changed here, item
    /// lists are kept consistent by the collection.
    pub(crate) fn prices_mut(&mut self) -> impl Iterator<Item = &mut f64> {
        self.batches.iter_mut().map(|b| &mut b.price)
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Batch> {
        self.batches.iter().find(|b| b.name == name)
    }

    /// All item names, in order of first appearance
    pub fn item_names(&self) -> IndexSet<&str> {
        self.batches
            .iter()
            .flat_map(|b| b.items.iter().map(|i| i.name.as_str()))
            .collect()
    }

    /// Whether any batch lists `item`
    pub fn contains_item(&self, item: &str) -> bool {
        self.batches.iter().any(|b| b.contains(item))
    }

    fn pad_items(&mut self) {
        let names: Vec<String> = self.item_names().into_iter().map(str::to_string).collect();
        pad_to(&mut self.batches, &names);
    }

    fn drop_empty_items(&mut self) {
        let empty: Vec<String> = self
            .item_names()
            .into_iter()
            .filter(|name| {
                self.batches
                    .iter()
                    .all(|b| b.quantity_of(name).unwrap_or(0.0) == 0.0)
            })
            .map(str::to_string)
            .collect();

        if empty.is_empty() {
            return;
        }
        for batch in &mut self.batches {
            batch.items.retain(|i| !empty.contains(&i.name));
        }
    }
}

impl<'a> IntoIterator for &'a BatchCollection {
    type Item = &'a Batch;
    type IntoIter = std::slice::Iter<'a, Batch>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.iter()
    }
}

fn pad_to(batches: &mut [Batch], names: &[String]) {
    for batch in batches {
        for name in names {
            if !batch.contains(name) {
                batch.items.push(ItemInBatch {
                    name: name.clone(),
                    quantity_in_batch: 0.0,
                });
            }
        }
    }
}

/// Batches grouped by seller
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "BatchListsData"))]
#[derive(Debug, Clone, PartialEq)]
pub struct BatchLists {
    #[cfg_attr(feature = "serde", serde(rename = "batchlists"))]
    collections: Vec<BatchCollection>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct BatchListsData {
    batchlists: Vec<BatchCollection>,
}

#[cfg(feature = "serde")]
impl TryFrom<BatchListsData> for BatchLists {
    type Error = ModelError;

    fn try_from(data: BatchListsData) -> Result<Self, Self::Error> {
        Self::new(data.batchlists)
    }
}

/// A multi-seller set flattened into one collection
#[derive(Debug, Clone, PartialEq)]
pub struct FlatBatches {
    /// Batches renamed to `"{seller}_{batch}"`
    pub collection: BatchCollection,
    /// Seller of each batch of `collection`, by position
    pub sellers: Vec<String>,
}

impl BatchLists {
    /// Group collections by seller, merging collections that share a seller,
    /// and pad every batch to the items offered by any seller.
    pub fn new(collections: Vec<BatchCollection>) -> Result<Self, ModelError> {
        let mut by_seller: IndexMap<String, Vec<Batch>> = IndexMap::new();
        for collection in collections {
            by_seller
                .entry(collection.seller)
                .or_default()
                .extend(collection.batches);
        }

        let mut collections = by_seller
            .into_iter()
            .map(|(seller, batches)| BatchCollection::new(seller, batches))
            .collect::<Result<Vec<_>, _>>()?;

        let names: IndexSet<String> = collections
            .iter()
            .flat_map(|c| c.item_names().into_iter().map(str::to_string).collect::<Vec<_>>())
            .collect();
        let names: Vec<String> = names.into_iter().collect();
        for collection in &mut collections {
            pad_to(&mut collection.batches, &names);
        }

        Ok(Self { collections })
    }

    pub fn collections(&self) -> &[BatchCollection] {
        &self.collections
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BatchCollection> {
        self.collections.iter()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn get(&self, seller: &str) -> Option<&BatchCollection> {
        self.collections.iter().find(|c| c.seller == seller)
    }

    /// Flatten into a single collection, prefixing batch names with their seller
    pub fn flatten(&self) -> Result<FlatBatches, ModelError> {
        let mut batches = Vec::new();
        let mut sellers = Vec::new();
        let mut owners: IndexMap<String, &str> = IndexMap::new();
        for collection in &self.collections {
            for batch in &collection.batches {
                let name = format!("{}_{}", collection.seller, batch.name);
                if let Some(first) = owners.insert(name.clone(), &collection.seller) {
                    return Err(ModelError::PrefixedNameClash {
                        name,
                        first: first.to_string(),
                        second: collection.seller.clone(),
                    });
                }
                batches.push(Batch {
                    name,
                    price: batch.price,
                    items: batch.items.clone(),
                });
                sellers.push(collection.seller.clone());
            }
        }
        Ok(FlatBatches {
            collection: BatchCollection::from_batches(batches)?,
            sellers,
        })
    }
}

/// A requested item with its accepted quantity range
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRequest {
    pub name: String,
    pub minimum_quantity: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub maximum_quantity: Option<f64>,
}

impl ItemRequest {
    pub fn new(name: impl Into<String>, minimum_quantity: f64, maximum_quantity: Option<f64>) -> Result<Self, ModelError> {
        let mut request = Self {
            name: name.into(),
            minimum_quantity,
            maximum_quantity,
        };
        request.normalize();
        request.validate()?;
        Ok(request)
    }

    /// A request with no committed minimum and no maximum
    pub fn unconstrained(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            minimum_quantity: 0.0,
            maximum_quantity: None,
        }
    }

    fn normalize(&mut self) {
        if self.maximum_quantity == Some(f64::INFINITY) {
            self.maximum_quantity = None;
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.minimum_quantity >= 0.0) {
            return Err(ModelError::NegativeQuantity {
                item: self.name.clone(),
                quantity: self.minimum_quantity,
            });
        }
        if let Some(maximum) = self.maximum_quantity {
            if !(maximum >= 0.0) {
                return Err(ModelError::NegativeQuantity {
                    item: self.name.clone(),
                    quantity: maximum,
                });
            }
            if self.minimum_quantity > maximum {
                return Err(ModelError::MinimumAboveMaximum {
                    item: self.name.clone(),
                    minimum: self.minimum_quantity,
                    maximum,
                });
            }
        }
        Ok(())
    }
}

/// The items a buyer requests, with unique names
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "DemandListData"))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DemandList {
    items: Vec<ItemRequest>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct DemandListData {
    items: Vec<ItemRequest>,
}

#[cfg(feature = "serde")]
impl TryFrom<DemandListData> for DemandList {
    type Error = ModelError;

    fn try_from(data: DemandListData) -> Result<Self, Self::Error> {
        Self::new(data.items)
    }
}

impl DemandList {
    pub fn new(items: Vec<ItemRequest>) -> Result<Self, ModelError> {
        let mut seen = IndexSet::new();
        let mut items = items;
        for item in &mut items {
            item.normalize();
            item.validate()?;
            if !seen.insert(item.name.clone()) {
                return Err(ModelError::DuplicateRequest(item.name.clone()));
            }
        }
        Ok(Self { items })
    }

    pub fn items(&self) -> &[ItemRequest] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ItemRequest> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ItemRequest> {
        self.items.iter().find(|i| i.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Add an unconstrained request for `name` unless it is already requested
    pub(crate) fn request_if_absent(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.items.push(ItemRequest::unconstrained(name));
        true
    }
}

impl<'a> IntoIterator for &'a DemandList {
    type Item = &'a ItemRequest;
    type IntoIter = std::slice::Iter<'a, ItemRequest>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
