use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::Entity;
use crate::domain::value_objects::EntityId;

/// Name given to listings started from scratch. Validators refuse to save a
/// listing that still carries it.
pub const PLACEHOLDER_NAME: &str = "New Agistment";

/// A horse-agistment listing as returned by the listings API.
///
/// Every nested struct defaults its fields so partial server payloads still
/// deserialise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Agistment {
    pub id: EntityId,
    pub basic_info: BasicInfo,
    pub contact: Contact,
    pub location: Location,
    pub paddocks: Paddocks,
    pub facilities: Facilities,
    pub riding_facilities: RidingFacilities,
    pub care: CareOptions,
    pub services: Vec<String>,
    pub photos: Vec<Photo>,
    pub hidden: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Agistment {
    fn default() -> Self {
        Self {
            id: EntityId::default(),
            basic_info: BasicInfo {
                name: PLACEHOLDER_NAME.to_string(),
                ..BasicInfo::default()
            },
            contact: Contact::default(),
            location: Location::default(),
            paddocks: Paddocks::default(),
            facilities: Facilities::default(),
            riding_facilities: RidingFacilities::default(),
            care: CareOptions::default(),
            services: Vec::new(),
            photos: Vec::new(),
            hidden: true,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Entity for Agistment {
    const VOLATILE_FIELDS: &'static [&'static str] = &["updatedAt"];

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicInfo {
    pub name: String,
    /// Acres.
    pub property_size: u32,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub address: String,
    pub suburb: String,
    pub state: String,
    pub postcode: String,
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Paddocks {
    pub private_paddocks: PaddockKind,
    pub shared_paddocks: PaddockKind,
    pub group_paddocks: PaddockKind,
}

impl Paddocks {
    /// `(wire name, paddock)` pairs, in display order.
    pub fn kinds(&self) -> [(&'static str, &PaddockKind); 3] {
        [
            ("privatePaddocks", &self.private_paddocks),
            ("sharedPaddocks", &self.shared_paddocks),
            ("groupPaddocks", &self.group_paddocks),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaddockKind {
    pub total_paddocks: u32,
    pub available: u32,
    pub weekly_price: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Facility {
    pub available: bool,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Facilities {
    pub feed_room: Facility,
    pub tack_room: Facility,
    pub float_parking: Facility,
    pub hot_wash: Facility,
    pub stable: Facility,
    pub tie_up_area: Facility,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Arena {
    pub length: u32,
    pub width: u32,
    pub comments: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RidingFacilities {
    pub arenas: Vec<Arena>,
    pub round_yards: Vec<Arena>,
    pub trail_riding: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CareOption {
    pub available: bool,
    pub monthly_price: u32,
    pub comments: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CareOptions {
    pub self_care: CareOption,
    pub part_care: CareOption,
    pub full_care: CareOption,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Photo {
    pub link: String,
    pub comment: Option<String>,
}
