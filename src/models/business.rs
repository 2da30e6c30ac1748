use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Bucket for services the business did not categorise.
pub const UNCATEGORIZED: &str = "Other";

const DEFAULT_DURATION_MINUTES: u32 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Business {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default, alias = "businessHours")]
    pub hours: Vec<BusinessHours>,
    #[serde(default, alias = "paymentOptions")]
    pub payment_options: Vec<String>,
    #[serde(default, alias = "instagramLink")]
    pub instagram_link: Option<String>,
    #[serde(default, alias = "telegramLink")]
    pub telegram_link: Option<String>,
    #[serde(default, alias = "facebookLink")]
    pub facebook_link: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub staff: Vec<Staff>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessHours {
    pub day: String,
    #[serde(default)]
    pub open: Option<String>,
    #[serde(default)]
    pub close: Option<String>,
    #[serde(default = "default_true", alias = "isOpen")]
    pub is_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, alias = "discountPercent")]
    pub discount: Option<f64>,
    /// Staff permitted to perform this service. `None` when the backend sent
    /// no mapping at all, which is different from an empty list.
    #[serde(
        default,
        alias = "staffIds",
        alias = "staff",
        deserialize_with = "id_refs"
    )]
    pub staff_ids: Option<Vec<String>>,
    #[serde(default = "default_true", alias = "isActive")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Staff {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, alias = "fullName")]
    pub full_name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(
        default,
        alias = "photos",
        alias = "avatarUrl",
        deserialize_with = "avatar_ref"
    )]
    pub avatar: Option<String>,
    #[serde(
        default,
        alias = "services",
        alias = "serviceIds",
        deserialize_with = "id_refs"
    )]
    pub service_ids: Option<Vec<String>>,
    #[serde(default = "default_true", alias = "isActive")]
    pub is_active: bool,
}

impl Business {
    /// Parses `GET /customer/business/{id}`, which answers either
    /// `{ "business": {...} }` or the business object itself.
    pub fn from_response(value: Value) -> Result<Self, serde_json::Error> {
        let inner = match value {
            Value::Object(mut map) if map.get("business").is_some_and(Value::is_object) => map
                .remove("business")
                .unwrap_or(Value::Null),
            other => other,
        };
        let mut business: Business = serde_json::from_value(inner)?;
        business.services.retain(|s| s.is_active);
        business.staff.retain(|s| s.is_active);
        Ok(business)
    }

    pub fn find_service(&self, service_id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == service_id)
    }

    pub fn social_links(&self) -> Vec<(&'static str, &str)> {
        [
            ("instagram", self.instagram_link.as_deref()),
            ("telegram", self.telegram_link.as_deref()),
            ("facebook", self.facebook_link.as_deref()),
            ("website", self.website.as_deref()),
        ]
        .into_iter()
        .filter_map(|(kind, url)| url.filter(|u| !u.is_empty()).map(|u| (kind, u)))
        .collect()
    }
}

impl Service {
    pub fn duration_minutes(&self) -> u32 {
        self.duration.filter(|d| *d > 0).unwrap_or(DEFAULT_DURATION_MINUTES)
    }

    pub fn base_price(&self) -> f64 {
        self.price.unwrap_or(0.0)
    }

    /// Price after the optional discount percent, clamped to 0..=100.
    pub fn effective_price(&self) -> f64 {
        let discount = self.discount.unwrap_or(0.0).clamp(0.0, 100.0);
        self.base_price() * (100.0 - discount) / 100.0
    }

    pub fn category_or_default(&self) -> &str {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED)
    }
}

/// Groups services by category, keeping the order in which categories first
/// appear.
pub fn group_by_category(services: &[Service]) -> Vec<(String, Vec<Service>)> {
    let mut groups: Vec<(String, Vec<Service>)> = Vec::new();
    for service in services {
        let category = service.category_or_default();
        match groups.iter_mut().find(|(name, _)| name == category) {
            Some((_, members)) => members.push(service.clone()),
            None => groups.push((category.to_string(), vec![service.clone()])),
        }
    }
    groups
}

/// Staff offered for `service`.
///
/// The service's own staff mapping wins. When the backend sent none, staff
/// whose embedded service list names the service are used instead. With no
/// mapping on either side the result is empty, never the whole roster.
pub fn eligible_staff(service: &Service, roster: &[Staff]) -> Vec<Staff> {
    if let Some(ids) = &service.staff_ids {
        return roster
            .iter()
            .filter(|s| ids.iter().any(|id| *id == s.id))
            .cloned()
            .collect();
    }

    roster
        .iter()
        .filter(|s| {
            s.service_ids
                .as_ref()
                .is_some_and(|ids| ids.iter().any(|id| *id == service.id))
        })
        .cloned()
        .collect()
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRef {
    Id(String),
    Object {
        #[serde(alias = "_id")]
        id: String,
    },
}

fn id_refs<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let refs: Option<Vec<IdRef>> = Option::deserialize(deserializer)?;
    Ok(refs.map(|refs| {
        refs.into_iter()
            .map(|r| match r {
                IdRef::Id(id) | IdRef::Object { id } => id,
            })
            .collect()
    }))
}

/// Accepts `"url"`, `{ "url": ... }` and `{ "avatar": { "url": ... } }`.
fn avatar_ref<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        v.as_str()
            .or_else(|| v["avatar"]["url"].as_str())
            .or_else(|| v["url"].as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }))
}
