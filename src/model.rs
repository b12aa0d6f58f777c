//! Inspection aggregate: areas and items are owned by their inspection and
//! only change through the methods below.
//!
//! Grade and statistics are not fields here. They are derived on demand by
//! [`crate::stats`] and [`crate::grading`], so a stale grade can never be
//! persisted alongside the items it summarizes.

use crate::error::{GradeError, GradeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_AREA_NAME: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    #[serde(alias = "pass", alias = "PASS")]
    Pass,
    #[serde(alias = "fail", alias = "FAIL")]
    Fail,
    #[serde(alias = "snags", alias = "SNAGS", alias = "snag", alias = "Snag")]
    Snags,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pass => "Pass",
            ItemStatus::Fail => "Fail",
            ItemStatus::Snags => "Snags",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionItem {
    pub id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub point: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Opaque references: base64 data URI, URL, or local-store key.
    #[serde(default)]
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionArea {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<InspectionItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub id: String,
    pub client_name: String,
    #[serde(default)]
    pub property_location: String,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub inspector_name: String,
    /// ISO date, `YYYY-MM-DD`.
    pub inspection_date: String,
    #[serde(default)]
    pub areas: Vec<InspectionArea>,
    /// Highest area/item sequence ever issued. Kept so ids of removed
    /// entries are never handed out again.
    #[serde(default, skip_serializing_if = "is_zero")]
    area_seq: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    item_seq: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl Inspection {
    /// A fresh inspection holds exactly one empty default area.
    pub fn new(id: impl Into<String>, client_name: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client_name: client_name.into(),
            property_location: String::new(),
            property_type: String::new(),
            inspector_name: String::new(),
            inspection_date: date.into(),
            areas: vec![InspectionArea {
                id: "area-1".into(),
                name: DEFAULT_AREA_NAME.into(),
                items: Vec::new(),
            }],
            area_seq: 1,
            item_seq: 0,
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &InspectionItem> {
        self.areas.iter().flat_map(|a| a.items.iter())
    }

    pub fn area(&self, area_id: &str) -> Option<&InspectionArea> {
        self.areas.iter().find(|a| a.id == area_id)
    }

    /// Ids are never reused, even after the area they named was removed.
    pub fn add_area(&mut self, name: impl Into<String>) -> GradeResult<String> {
        let seq = next_seq(self.area_seq, self.areas.iter().map(|a| a.id.as_str()), "area-")?;
        let id = format!("area-{seq}");
        self.areas.push(InspectionArea {
            id: id.clone(),
            name: name.into(),
            items: Vec::new(),
        });
        self.area_seq = seq;
        Ok(id)
    }

    /// Removes the area and every item it owns.
    pub fn remove_area(&mut self, area_id: &str) -> GradeResult<InspectionArea> {
        let idx = self
            .areas
            .iter()
            .position(|a| a.id == area_id)
            .ok_or_else(|| GradeError::NotFound(format!("area {area_id}")))?;
        Ok(self.areas.remove(idx))
    }

    pub fn add_item(
        &mut self,
        area_id: &str,
        category: impl Into<String>,
        point: impl Into<String>,
        status: ItemStatus,
    ) -> GradeResult<String> {
        // item ids are unique across the whole inspection, not per area
        let seq = next_seq(self.item_seq, self.items().map(|i| i.id.as_str()), "item-")?;
        let area = self.area_mut(area_id)?;
        let id = format!("item-{seq}");
        area.items.push(InspectionItem {
            id: id.clone(),
            category: category.into(),
            point: point.into(),
            status,
            comment: None,
            location: None,
            photos: Vec::new(),
        });
        self.item_seq = seq;
        Ok(id)
    }

    pub fn remove_item(&mut self, area_id: &str, item_id: &str) -> GradeResult<InspectionItem> {
        let area = self.area_mut(area_id)?;
        let idx = area
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| GradeError::NotFound(format!("item {item_id}")))?;
        Ok(area.items.remove(idx))
    }

    pub fn set_status(&mut self, area_id: &str, item_id: &str, status: ItemStatus) -> GradeResult<()> {
        self.item_mut(area_id, item_id)?.status = status;
        Ok(())
    }

    pub fn set_comment(&mut self, area_id: &str, item_id: &str, comment: Option<String>) -> GradeResult<()> {
        self.item_mut(area_id, item_id)?.comment = comment.filter(|c| !c.trim().is_empty());
        Ok(())
    }

    pub fn set_location(&mut self, area_id: &str, item_id: &str, location: Option<String>) -> GradeResult<()> {
        self.item_mut(area_id, item_id)?.location = location.filter(|l| !l.trim().is_empty());
        Ok(())
    }

    pub fn add_photo(&mut self, area_id: &str, item_id: &str, photo: impl Into<String>) -> GradeResult<()> {
        let photo = photo.into();
        if photo.trim().is_empty() {
            return Err(GradeError::InvalidInput("empty photo reference".into()));
        }
        self.item_mut(area_id, item_id)?.photos.push(photo);
        Ok(())
    }

    /// Structural checks on a record loaded from outside.
    pub fn validate(&self) -> GradeResult<()> {
        if self.id.trim().is_empty() {
            return Err(GradeError::InvalidInput("inspection id is empty".into()));
        }
        if self.client_name.trim().is_empty() {
            return Err(GradeError::InvalidInput("client name is empty".into()));
        }
        crate::util::parse_iso_date(&self.inspection_date)?;

        let mut area_ids = HashSet::new();
        let mut item_ids = HashSet::new();
        for area in &self.areas {
            if !area_ids.insert(area.id.as_str()) {
                return Err(GradeError::InvalidInput(format!("duplicate area id: {}", area.id)));
            }
            for item in &area.items {
                if !item_ids.insert(item.id.as_str()) {
                    return Err(GradeError::InvalidInput(format!("duplicate item id: {}", item.id)));
                }
            }
        }
        Ok(())
    }

    fn area_mut(&mut self, area_id: &str) -> GradeResult<&mut InspectionArea> {
        self.areas
            .iter_mut()
            .find(|a| a.id == area_id)
            .ok_or_else(|| GradeError::NotFound(format!("area {area_id}")))
    }

    fn item_mut(&mut self, area_id: &str, item_id: &str) -> GradeResult<&mut InspectionItem> {
        self.area_mut(area_id)?
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| GradeError::NotFound(format!("item {item_id}")))
    }
}

fn next_seq<'a>(issued: u32, ids: impl Iterator<Item = &'a str>, prefix: &str) -> GradeResult<u32> {
    ids.filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|n| n.parse::<u32>().ok())
        .fold(issued, u32::max)
        .checked_add(1)
        .ok_or_else(|| GradeError::InvalidInput(format!("{prefix}N id sequence exhausted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Inspection {
        Inspection::new("insp-1", "Jane Client", "2024-05-01")
    }

    #[test]
    fn new_inspection_has_one_empty_default_area() {
        let insp = sample();
        assert_eq!(insp.areas.len(), 1);
        assert_eq!(insp.areas[0].name, DEFAULT_AREA_NAME);
        assert!(insp.areas[0].items.is_empty());
        assert!(insp.validate().is_ok());
    }

    #[test]
    fn item_ids_stay_unique_after_removal() {
        let mut insp = sample();
        let kitchen = insp.add_area("Kitchen").unwrap();
        let a = insp.add_item("area-1", "Walls", "Paint finish", ItemStatus::Pass).unwrap();
        let b = insp.add_item(&kitchen, "Sink", "Leak test", ItemStatus::Fail).unwrap();
        insp.remove_item("area-1", &a).unwrap();
        let c = insp.add_item("area-1", "Walls", "Cracks", ItemStatus::Snags).unwrap();
        assert_ne!(b, c);
        assert!(insp.validate().is_ok());
    }

    #[test]
    fn edits_on_unknown_ids_are_not_found() {
        let mut insp = sample();
        let err = insp.set_status("area-9", "item-1", ItemStatus::Pass).unwrap_err();
        assert!(matches!(err, GradeError::NotFound(_)));
        let err = insp.remove_item("area-1", "item-1").unwrap_err();
        assert!(matches!(err, GradeError::NotFound(_)));
    }

    #[test]
    fn area_ids_not_reused_after_removal() {
        let mut insp = sample();
        let kitchen = insp.add_area("Kitchen").unwrap();
        insp.remove_area(&kitchen).unwrap();
        let bath = insp.add_area("Bath").unwrap();
        assert_ne!(kitchen, bath);

        let a = insp.add_item("area-1", "Doors", "Hinges", ItemStatus::Pass).unwrap();
        insp.remove_item("area-1", &a).unwrap();
        let b = insp.add_item("area-1", "Doors", "Lock", ItemStatus::Pass).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn issued_sequence_survives_serde() {
        let mut insp = sample();
        let kitchen = insp.add_area("Kitchen").unwrap();
        insp.remove_area(&kitchen).unwrap();
        let raw = serde_json::to_string(&insp).unwrap();
        let mut back: Inspection = serde_json::from_str(&raw).unwrap();
        assert_ne!(back.add_area("Bath").unwrap(), kitchen);
    }

    #[test]
    fn exhausted_id_sequence_is_an_error() {
        let raw = r#"{
            "id": "big", "clientName": "C", "inspectionDate": "2024-01-01",
            "areas": [
                {"id": "area-4294967295", "name": "Roof",
                 "items": [{"id": "item-4294967295", "status": "Pass"}]}
            ]
        }"#;
        let mut insp: Inspection = serde_json::from_str(raw).unwrap();
        assert!(insp.validate().is_ok());

        let err = insp
            .add_item("area-4294967295", "Roof", "Tiles", ItemStatus::Pass)
            .unwrap_err();
        assert!(matches!(err, GradeError::InvalidInput(_)));
        assert!(matches!(insp.add_area("Attic"), Err(GradeError::InvalidInput(_))));
        assert_eq!(insp.items().count(), 1);
        assert_eq!(insp.areas.len(), 1);
    }

    #[test]
    fn removing_area_drops_its_items() {
        let mut insp = sample();
        insp.add_item("area-1", "Doors", "Hinges", ItemStatus::Pass).unwrap();
        let removed = insp.remove_area("area-1").unwrap();
        assert_eq!(removed.items.len(), 1);
        assert_eq!(insp.items().count(), 0);
    }

    #[test]
    fn blank_comment_clears_field() {
        let mut insp = sample();
        let id = insp.add_item("area-1", "Doors", "Hinges", ItemStatus::Snags).unwrap();
        insp.set_comment("area-1", &id, Some("squeaks".into())).unwrap();
        insp.set_comment("area-1", &id, Some("   ".into())).unwrap();
        insp.set_location("area-1", &id, Some("bedroom door".into())).unwrap();
        let item = &insp.area("area-1").unwrap().items[0];
        assert_eq!(item.comment, None);
        assert_eq!(item.location.as_deref(), Some("bedroom door"));
    }

    #[test]
    fn status_accepts_lowercase_aliases() {
        let s: ItemStatus = serde_json::from_str("\"snags\"").unwrap();
        assert_eq!(s, ItemStatus::Snags);
        assert_eq!(serde_json::to_string(&ItemStatus::Fail).unwrap(), "\"Fail\"");
    }

    #[test]
    fn validate_rejects_bad_date_and_duplicate_ids() {
        let mut insp = sample();
        insp.inspection_date = "01/05/2024".into();
        assert!(insp.validate().is_err());

        let mut insp = sample();
        insp.add_item("area-1", "A", "B", ItemStatus::Pass).unwrap();
        let dup = insp.areas[0].items[0].clone();
        insp.areas[0].items.push(dup);
        assert!(insp.validate().is_err());
    }
}
