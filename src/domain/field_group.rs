use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::agistment::{
    Agistment, CareOptions, Contact, Facilities, Location, Paddocks, Photo, RidingFacilities,
};
use crate::domain::entity::Entity;
use crate::domain::photos::reorder;

/// The subset of an entity one edit session manages.
///
/// A field group must serialise to a JSON object: its top-level keys are the
/// field names accepted by `EditSessionController::edit`.
pub trait FieldGroup:
    Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Entity: Entity;

    /// Stable identifier, used in logs and on the command line.
    const NAME: &'static str;

    /// Human wording used in notifications ("Failed to update {LABEL}").
    const LABEL: &'static str;

    fn extract(entity: &Self::Entity) -> Self;

    fn apply(&self, entity: &mut Self::Entity);

    /// Partial entity sent to the server: the group nested where it lives in
    /// the entity.
    fn to_partial(&self) -> Value {
        let mut entity = serde_json::Map::new();
        entity.insert(
            Self::NAME.to_string(),
            serde_json::to_value(self).unwrap_or(Value::Null),
        );
        Value::Object(entity)
    }
}

// ─── Header ───────────────────────────────────────────────────────────────────

/// Listing name and property size, edited from the page header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub name: String,
    pub property_size: u32,
}

impl FieldGroup for Header {
    type Entity = Agistment;

    const NAME: &'static str = "header";
    const LABEL: &'static str = "listing details";

    fn extract(entity: &Agistment) -> Self {
        Self {
            name: entity.basic_info.name.clone(),
            property_size: entity.basic_info.property_size,
        }
    }

    fn apply(&self, entity: &mut Agistment) {
        entity.basic_info.name = self.name.clone();
        entity.basic_info.property_size = self.property_size;
    }

    fn to_partial(&self) -> Value {
        json!({ "basicInfo": { "name": self.name, "propertySize": self.property_size } })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub description: String,
}

impl FieldGroup for Description {
    type Entity = Agistment;

    const NAME: &'static str = "description";
    const LABEL: &'static str = "description";

    fn extract(entity: &Agistment) -> Self {
        Self {
            description: entity.basic_info.description.clone(),
        }
    }

    fn apply(&self, entity: &mut Agistment) {
        entity.basic_info.description = self.description.clone();
    }

    fn to_partial(&self) -> Value {
        json!({ "basicInfo": { "description": self.description } })
    }
}

// ─── Whole-section groups ─────────────────────────────────────────────────────
//
// These wrap one section of the listing verbatim and serialise as it.

macro_rules! section_group {
    ($group:ident($inner:ty), $field:ident, $name:literal, $label:literal) => {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $group(pub $inner);

        impl FieldGroup for $group {
            type Entity = Agistment;

            const NAME: &'static str = $name;
            const LABEL: &'static str = $label;

            fn extract(entity: &Agistment) -> Self {
                Self(entity.$field.clone())
            }

            fn apply(&self, entity: &mut Agistment) {
                entity.$field = self.0.clone();
            }
        }
    };
}

section_group!(ContactInfo(Contact), contact, "contact", "contact information");
section_group!(LocationInfo(Location), location, "location", "location");
section_group!(PaddockGroup(Paddocks), paddocks, "paddocks", "paddocks");
section_group!(FacilityGroup(Facilities), facilities, "facilities", "facilities");
section_group!(
    RidingGroup(RidingFacilities),
    riding_facilities,
    "ridingFacilities",
    "riding facilities"
);
section_group!(CareGroup(CareOptions), care, "care", "care options");

// ─── List groups ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceGroup {
    pub services: Vec<String>,
}

impl FieldGroup for ServiceGroup {
    type Entity = Agistment;

    const NAME: &'static str = "services";
    const LABEL: &'static str = "services";

    fn extract(entity: &Agistment) -> Self {
        Self {
            services: entity.services.clone(),
        }
    }

    fn apply(&self, entity: &mut Agistment) {
        entity.services = self.services.clone();
    }

    fn to_partial(&self) -> Value {
        json!({ "services": self.services })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoGroup {
    pub photos: Vec<Photo>,
}

impl PhotoGroup {
    /// Move the photo at `from` to `to`, as a drag-and-drop would.
    pub fn move_photo(&mut self, from: usize, to: usize) {
        self.photos = reorder(&self.photos, from, to);
    }
}

impl FieldGroup for PhotoGroup {
    type Entity = Agistment;

    const NAME: &'static str = "photos";
    const LABEL: &'static str = "photos";

    fn extract(entity: &Agistment) -> Self {
        Self {
            photos: entity.photos.clone(),
        }
    }

    fn apply(&self, entity: &mut Agistment) {
        entity.photos = self.photos.clone();
    }

    fn to_partial(&self) -> Value {
        json!({ "photos": self.photos })
    }
}

/// Wire names of every field group defined for [`Agistment`].
pub const GROUP_NAMES: [&str; 10] = [
    Header::NAME,
    Description::NAME,
    ContactInfo::NAME,
    LocationInfo::NAME,
    PaddockGroup::NAME,
    FacilityGroup::NAME,
    RidingGroup::NAME,
    CareGroup::NAME,
    ServiceGroup::NAME,
    PhotoGroup::NAME,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Agistment {
        let mut a = Agistment::default();
        a.basic_info.name = "Barn A".into();
        a.basic_info.property_size = 10;
        a.contact.email = "owner@example.com".into();
        a
    }

    #[test]
    fn extract_then_apply_is_identity() {
        let mut entity = listing();
        let before = entity.clone();
        ContactInfo::extract(&entity).apply(&mut entity);
        Header::extract(&entity).apply(&mut entity);
        assert_eq!(entity, before);
    }

    #[test]
    fn header_partial_nests_under_basic_info() {
        let header = Header::extract(&listing());
        assert_eq!(
            header.to_partial(),
            json!({ "basicInfo": { "name": "Barn A", "propertySize": 10 } })
        );
    }

    #[test]
    fn section_group_serialises_as_section() {
        let contact = ContactInfo::extract(&listing());
        let partial = contact.to_partial();
        assert_eq!(partial["contact"]["email"], "owner@example.com");
        assert_eq!(
            serde_json::to_value(&contact).unwrap(),
            serde_json::to_value(&listing().contact).unwrap()
        );
    }

    #[test]
    fn move_photo_reorders() {
        let mut group = PhotoGroup {
            photos: ["a", "b", "c"]
                .iter()
                .map(|l| Photo {
                    link: l.to_string(),
                    comment: None,
                })
                .collect(),
        };
        group.move_photo(0, 2);
        let links: Vec<_> = group.photos.iter().map(|p| p.link.as_str()).collect();
        assert_eq!(links, ["b", "c", "a"]);
    }
}
