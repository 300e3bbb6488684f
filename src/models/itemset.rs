use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Value of one attribute inside an itemset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    /// The attribute takes part in the itemset with this value
    Fixed(String),
    /// The attribute is not part of the itemset
    Wildcard,
}

impl AttributeValue {
    pub fn as_fixed(&self) -> Option<&str> {
        match self {
            Self::Fixed(value) => Some(value),
            Self::Wildcard => None,
        }
    }
}

/// One candidate explanation found by the miner, spanning the whole attribute universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequentItemSet {
    /// Attribute name -> value, in attribute-universe order
    pub attributes: Vec<(String, AttributeValue)>,
    /// Confidence divided by the outlier rate outside the itemset
    pub risk_ratio: f64,
    /// Outliers in the itemset / all rows
    pub occurrence_ratio: f64,
    /// Outliers in the itemset / all outliers
    pub support_ratio: f64,
    /// Outliers in the itemset / rows in the itemset
    pub confidence: f64,
}

impl FrequentItemSet {
    /// Number of attributes fixed by this itemset.
    pub fn specificity(&self) -> usize {
        self.attributes
            .iter()
            .filter(|(_, value)| matches!(value, AttributeValue::Fixed(_)))
            .count()
    }

    /// Fixed (attribute, value) pairs in universe order.
    pub fn fixed_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .filter_map(|(name, value)| value.as_fixed().map(|v| (name.as_str(), v)))
    }

    pub fn explanation(&self) -> Explanation {
        Explanation::new(self.fixed_pairs().map(|(_, value)| value.to_string()).collect())
    }

    /// Equality used by deduplication: all four statistics are bitwise identical.
    pub fn has_same_statistics(&self, other: &FrequentItemSet) -> bool {
        self.risk_ratio.to_bits() == other.risk_ratio.to_bits()
            && self.occurrence_ratio.to_bits() == other.occurrence_ratio.to_bits()
            && self.support_ratio.to_bits() == other.support_ratio.to_bits()
            && self.confidence.to_bits() == other.confidence.to_bits()
    }

    /// Ranking order: ascending risk ratio.
    pub fn cmp_by_risk(&self, other: &FrequentItemSet) -> Ordering {
        self.risk_ratio.total_cmp(&other.risk_ratio)
    }
}

/// The fixed values of an itemset, attribute names dropped.
///
/// Values are unique across the attribute universe, so a value identifies its attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Explanation(Vec<String>);

impl Explanation {
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every value of `self` appears in `other` and `other` has more values.
    pub fn is_proper_subset_of(&self, other: &Explanation) -> bool {
        crate::utils::is_proper_subset(&self.0, &other.0)
    }
}

impl<S: Into<String>> FromIterator<S> for Explanation {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}
