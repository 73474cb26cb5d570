use serde::{Deserialize, Serialize};

use crate::pipeline::derive_id;

/// A single game as it accumulates metadata and pricing across pipeline stages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    /// Derived from the requested name, see [`derive_id`]
    pub id: String,
    pub name: String,
    pub description: String,
    pub genre: Option<String>,
    pub playtime: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub current_price: Option<f64>,
    pub original_price: Option<f64>,
    pub discount: Option<i32>,
    pub link: Option<String>,
}

impl GameRecord {
    /// Builds a description-only record from a catalog lookup.
    ///
    /// The id comes from `requested_name`, not from the catalog's canonical name, so the
    /// record joins with a price record computed for the same request.
    pub fn from_description(requested_name: &str, description: GameDescription) -> Self {
        Self {
            id: derive_id(requested_name),
            name: description.name,
            description: description.description,
            genre: description.genre,
            playtime: description.playtime,
            tags: description.tags,
            image_url: description.image_url,
            current_price: None,
            original_price: None,
            discount: None,
            link: None,
        }
    }

    /// Placeholder used when the description lookup for `name` fails
    pub fn degraded(name: &str) -> Self {
        Self {
            id: derive_id(name),
            name: name.to_string(),
            description: format!("{} is a video game.", name),
            genre: None,
            playtime: None,
            tags: None,
            image_url: None,
            current_price: None,
            original_price: None,
            discount: None,
            link: None,
        }
    }

    /// Splices price fields into this record
    pub fn with_price(mut self, price: Option<&PriceRecord>) -> Self {
        self.current_price = price.and_then(|p| p.current_price);
        self.original_price = price.and_then(|p| p.original_price);
        self.discount = price.and_then(|p| p.discount);
        self.link = price.and_then(|p| p.link.clone());
        self
    }

    /// True when the record carries both a description and a current price
    pub fn is_complete(&self) -> bool {
        !self.description.is_empty() && self.current_price.is_some()
    }
}

/// Price-bearing partial record keyed by derived id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    pub id: String,
    pub name: String,
    pub current_price: Option<f64>,
    pub original_price: Option<f64>,
    pub discount: Option<i32>,
    pub link: Option<String>,
}

impl PriceRecord {
    pub fn from_snapshot(name: &str, snapshot: &PriceSnapshot) -> Self {
        Self {
            id: derive_id(name),
            name: name.to_string(),
            current_price: Some(snapshot.current_price),
            original_price: Some(snapshot.regular_price),
            discount: Some(discount_percent(
                snapshot.regular_price,
                snapshot.current_price,
            )),
            link: Some(snapshot.url.clone()),
        }
    }

    /// Placeholder used when the price lookup for `name` fails
    pub fn degraded(name: &str) -> Self {
        Self {
            id: derive_id(name),
            name: name.to_string(),
            current_price: None,
            original_price: None,
            discount: None,
            link: None,
        }
    }
}

/// Percentage off the regular price, rounded to the nearest integer.
///
/// Returns 0 when the regular price is not positive.
pub fn discount_percent(regular: f64, current: f64) -> i32 {
    if regular > 0.0 {
        ((regular - current) / regular * 100.0).round() as i32
    } else {
        0
    }
}

/// Canonical metadata returned by a description tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameDescription {
    pub name: String,
    pub description: String,
    pub genre: Option<String>,
    pub playtime: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
}

/// Pricing snapshot returned by a price tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub current_price: f64,
    pub regular_price: f64,
    pub url: String,
}

/// A ranked search snippet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub content: String,
    pub score: f32,
}

/// Terminal output of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecommendation {
    pub game: GameRecord,
    pub reasoning: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(current: f64, regular: f64) -> PriceSnapshot {
        PriceSnapshot {
            current_price: current,
            regular_price: regular,
            url: "https://isthereanydeal.com/game/hades/".to_string(),
        }
    }

    #[test]
    fn test_discount_percent() {
        assert_eq!(discount_percent(60.0, 45.0), 25);
        assert_eq!(discount_percent(0.0, 10.0), 0);
        assert_eq!(discount_percent(14.99, 14.99), 0);
        assert_eq!(discount_percent(19.99, 4.99), 75);
    }

    #[test]
    fn test_price_record_from_snapshot() {
        let record = PriceRecord::from_snapshot("Hades", &snapshot(12.49, 24.99));

        assert_eq!(record.id, "hades");
        assert_eq!(record.current_price, Some(12.49));
        assert_eq!(record.original_price, Some(24.99));
        assert_eq!(record.discount, Some(50));
        assert!(record.link.is_some());
    }

    #[test]
    fn test_degraded_description() {
        let record = GameRecord::degraded("Outer Wilds");

        assert_eq!(record.id, "outer-wilds");
        assert_eq!(record.description, "Outer Wilds is a video game.");
        assert!(record.genre.is_none());
        assert!(!record.is_complete());
    }

    #[test]
    fn test_from_description_keeps_requested_id() {
        let description = GameDescription {
            name: "The Witcher 3: Wild Hunt".to_string(),
            description: "Open world RPG.".to_string(),
            genre: Some("RPG".to_string()),
            playtime: Some("46 hours".to_string()),
            tags: None,
            image_url: None,
        };

        let record = GameRecord::from_description("witcher 3", description);
        assert_eq!(record.id, "witcher-3");
        assert_eq!(record.name, "The Witcher 3: Wild Hunt");
    }

    #[test]
    fn test_serializes_camel_case() {
        let record = GameRecord::degraded("Celeste")
            .with_price(Some(&PriceRecord::from_snapshot("Celeste", &snapshot(4.99, 19.99))));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["currentPrice"], 4.99);
        assert_eq!(json["originalPrice"], 19.99);
        assert_eq!(json["imageUrl"], serde_json::Value::Null);
    }
}
