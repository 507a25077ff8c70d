use std::fmt::{Display, Formatter};

use serde::Deserialize;
use tracing::{debug, info, trace, warn};

use crate::error::{DuplicateError, Result, ValidationError};
use crate::extract::{extract, Identifier};

// Policy & configuration
//------------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// The operator opens or selects the active box; duplicates are rejected
    Manual,
    /// Boxes are numbered and a new one starts whenever the current one is full
    #[default]
    #[serde(alias = "auto")]
    Automatic,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub policy: Policy,
    /// Items per box under the automatic policy
    pub capacity: usize,
    pub box_prefix: String,
    /// Items per box under the manual policy, unlimited when unset
    pub manual_capacity: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            policy: Policy::Automatic,
            capacity: DEFAULT_BOX_CAPACITY,
            box_prefix: DEFAULT_BOX_PREFIX.to_string(),
            manual_capacity: None,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.capacity == 0 {
            return Err(ValidationError::InvalidConfig("session.capacity must be positive".into()));
        }
        if self.manual_capacity == Some(0) {
            return Err(ValidationError::InvalidConfig(
                "session.manual_capacity must be positive".into(),
            ));
        }
        if self.policy == Policy::Automatic && self.box_prefix.trim().is_empty() {
            return Err(ValidationError::InvalidConfig("session.box_prefix is empty".into()));
        }
        Ok(())
    }
}

// Box
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceBox {
    name: String,
    items: Vec<Identifier>,
}

impl DeviceBox {
    fn new(name: String) -> Self {
        Self { name, items: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[Identifier] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Most recently added identifier
    pub fn last(&self) -> Option<&Identifier> {
        self.items.last()
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.items.contains(id)
    }

    /// QR payload: identifiers joined by newlines, in insertion order
    pub fn payload(&self) -> String {
        self.items.iter().map(Identifier::as_str).collect::<Vec<_>>().join("\n")
    }

    fn push(&mut self, id: Identifier) {
        self.items.push(id);
    }
}

/// Outcome of [`Session::get_or_create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Created,
    Found,
}

/// What a batch of identifiers did to the session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AddReport {
    pub added: Vec<Identifier>,
    pub duplicates: Vec<DuplicateError>,
    pub opened: Vec<String>,
}

impl AddReport {
    pub fn added_count(&self) -> usize {
        self.added.len()
    }
}

impl Display for AddReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} identifier(s) added", self.added.len())?;
        if !self.duplicates.is_empty() {
            write!(f, ", {} duplicate(s) skipped", self.duplicates.len())?;
        }
        if !self.opened.is_empty() {
            write!(f, ", opened {}", self.opened.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxSummary {
    pub name: String,
    pub count: usize,
    pub items: Vec<Identifier>,
}

impl Display for BoxSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({} IMEIs)", self.name, self.count)?;
        for id in &self.items {
            writeln!(f, "  {id}")?;
        }
        Ok(())
    }
}

// Session
//------------------------------------------------------------------------------

/// Boxes collected during one interactive session, owned by the caller.
///
/// Handlers that fail validation return before touching any state. Exports
/// only ever borrow the session immutably.
#[derive(Debug, Clone)]
pub struct Session {
    config: SessionConfig,
    // Creation order
    boxes: Vec<DeviceBox>,
    active: Option<usize>,
    counter: usize,
    product_code: String,
    invoice: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            boxes: Vec::new(),
            active: None,
            counter: 1,
            product_code: String::new(),
            invoice: String::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn policy(&self) -> Policy {
        self.config.policy
    }

    pub fn boxes(&self) -> &[DeviceBox] {
        &self.boxes
    }

    pub fn find(&self, name: &str) -> Option<&DeviceBox> {
        self.boxes.iter().find(|b| b.name == name)
    }

    pub fn active_box(&self) -> Option<&DeviceBox> {
        self.active.map(|i| &self.boxes[i])
    }

    /// Number of the box the automatic policy fills next
    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn total_items(&self) -> usize {
        self.boxes.iter().map(DeviceBox::len).sum()
    }

    pub fn product_code(&self) -> &str {
        &self.product_code
    }

    pub fn set_product_code(&mut self, code: impl Into<String>) {
        self.product_code = code.into();
    }

    pub fn invoice(&self) -> &str {
        &self.invoice
    }

    pub fn set_invoice(&mut self, invoice: impl Into<String>) {
        self.invoice = invoice.into();
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.boxes.iter().position(|b| b.name == name)
    }

    fn get_or_create_index(&mut self, name: &str) -> Result<(Lookup, usize)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyBoxName.into());
        }
        match self.position(name) {
            Some(i) => Ok((Lookup::Found, i)),
            None => {
                debug!(name, "Creating box");
                self.boxes.push(DeviceBox::new(name.to_string()));
                Ok((Lookup::Created, self.boxes.len() - 1))
            }
        }
    }

    /// Returns the box with this name, creating an empty one if needed.
    pub fn get_or_create(&mut self, name: &str) -> Result<(Lookup, &mut DeviceBox)> {
        let (lookup, i) = self.get_or_create_index(name)?;
        Ok((lookup, &mut self.boxes[i]))
    }

    /// Scans a master code: creates the box if needed and makes it active.
    pub fn open_box(&mut self, name: &str) -> Result<Lookup> {
        if self.config.policy != Policy::Manual {
            return Err(ValidationError::ManualOnly.into());
        }
        let (lookup, i) = self.get_or_create_index(name)?;
        self.active = Some(i);
        info!(name = %self.boxes[i].name, ?lookup, "Opened box");
        Ok(lookup)
    }

    /// Makes an existing box active.
    pub fn select(&mut self, name: &str) -> Result<()> {
        if self.config.policy != Policy::Manual {
            return Err(ValidationError::ManualOnly.into());
        }
        let i = self
            .position(name.trim())
            .ok_or_else(|| ValidationError::UnknownBox(name.trim().to_string()))?;
        self.active = Some(i);
        info!(name = %self.boxes[i].name, "Selected box");
        Ok(())
    }

    /// Extracts identifiers from raw text and adds them.
    pub fn add_text(&mut self, text: &str) -> Result<AddReport> {
        self.add_identifiers(extract(text))
    }

    pub fn add_identifiers(&mut self, ids: Vec<Identifier>) -> Result<AddReport> {
        if ids.is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        let report = match self.config.policy {
            Policy::Manual => self.add_manual(ids)?,
            Policy::Automatic => self.add_automatic(ids)?,
        };
        info!(
            added = report.added.len(),
            duplicates = report.duplicates.len(),
            opened = report.opened.len(),
            "Added identifiers"
        );
        Ok(report)
    }

    fn add_manual(&mut self, ids: Vec<Identifier>) -> Result<AddReport> {
        let i = self.active.ok_or(ValidationError::NoActiveBox)?;

        if let Some(capacity) = self.config.manual_capacity {
            let target = &self.boxes[i];
            let mut fresh = Vec::new();
            for id in &ids {
                if !target.contains(id) && !fresh.contains(&id) {
                    fresh.push(id);
                }
            }
            if target.len() + fresh.len() > capacity {
                return Err(ValidationError::BoxFull { name: target.name.clone(), capacity }.into());
            }
        }

        let mut report = AddReport::default();
        let target = &mut self.boxes[i];
        for id in ids {
            if target.contains(&id) {
                warn!(box_name = %target.name, "Duplicate identifier skipped");
                trace!(identifier = %id, "Duplicate");
                report.duplicates.push(DuplicateError { box_name: target.name.clone(), identifier: id });
            } else {
                trace!(box_name = %target.name, identifier = %id, "Appended");
                target.push(id.clone());
                report.added.push(id);
            }
        }
        Ok(report)
    }

    fn add_automatic(&mut self, ids: Vec<Identifier>) -> Result<AddReport> {
        let mut report = AddReport::default();
        for id in ids {
            let name = format!("{}{}", self.config.box_prefix, self.counter);
            let (lookup, i) = self.get_or_create_index(&name)?;
            if lookup == Lookup::Created {
                report.opened.push(name);
            }
            let target = &mut self.boxes[i];
            trace!(box_name = %target.name, identifier = %id, "Appended");
            target.push(id.clone());
            report.added.push(id);
            if target.len() >= self.config.capacity {
                debug!(box_name = %target.name, "Box full");
                self.counter += 1;
            }
        }
        Ok(report)
    }

    /// Replaces every box with one box per identifier, named after it.
    ///
    /// Repeated identifiers collapse into a single box. Returns the number of
    /// boxes created.
    pub fn load_bulk(&mut self, ids: Vec<Identifier>) -> Result<usize> {
        if ids.is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        self.boxes.clear();
        self.active = None;
        self.counter = 1;
        for id in ids {
            let (lookup, i) = self.get_or_create_index(id.as_str())?;
            if lookup == Lookup::Created {
                self.boxes[i].push(id);
            }
        }
        info!(boxes = self.boxes.len(), "Bulk import loaded");
        Ok(self.boxes.len())
    }

    /// Drops every box; product code & invoice are kept.
    pub fn clear(&mut self) {
        self.boxes.clear();
        self.active = None;
        self.counter = 1;
        info!("Session cleared");
    }

    pub fn summary(&self) -> Vec<BoxSummary> {
        self.boxes
            .iter()
            .map(|b| BoxSummary { name: b.name.clone(), count: b.len(), items: b.items.clone() })
            .collect()
    }
}

#[cfg(test)]
mod session_tests {
    use super::{Lookup, Policy, Session, SessionConfig};
    use crate::error::{Error, ValidationError};
    use crate::extract::Identifier;

    fn ids(values: &[&str]) -> Vec<Identifier> {
        values.iter().map(|v| Identifier::new(*v).unwrap()).collect()
    }

    fn manual() -> Session {
        Session::new(SessionConfig { policy: Policy::Manual, ..SessionConfig::default() })
    }

    fn sizes(session: &Session) -> Vec<usize> {
        session.boxes().iter().map(|b| b.len()).collect()
    }

    #[test]
    fn test_get_or_create() {
        let mut session = Session::default();
        let (lookup, b) = session.get_or_create("A").unwrap();
        assert_eq!(lookup, Lookup::Created);
        assert_eq!(b.name(), "A");
        let (lookup, _) = session.get_or_create(" A ").unwrap();
        assert_eq!(lookup, Lookup::Found);
        assert_eq!(session.boxes().len(), 1);
        assert!(matches!(
            session.get_or_create("  "),
            Err(Error::Validation(ValidationError::EmptyBoxName))
        ));
    }

    #[test]
    fn test_automatic_splits_at_capacity() {
        let mut session = Session::default();
        let batch = (0..120).map(|i| Identifier::new(format!("{i:015}")).unwrap()).collect();
        let report = session.add_identifiers(batch).unwrap();
        assert_eq!(sizes(&session), vec![50, 50, 20]);
        assert_eq!(report.added_count(), 120);
        assert_eq!(report.opened, vec!["Box_1", "Box_2", "Box_3"]);
        assert_eq!(session.boxes()[1].items()[0].as_str(), "000000000000050");
        assert_eq!(session.counter(), 3);
    }

    #[test]
    fn test_automatic_counter_advances_after_filling_append() {
        let config = SessionConfig { capacity: 2, ..SessionConfig::default() };
        let mut session = Session::new(config);
        session.add_text("1 2").unwrap();
        assert_eq!(session.counter(), 2);
        session.add_text("3").unwrap();
        assert_eq!(sizes(&session), vec![2, 1]);
        assert_eq!(session.boxes()[1].name(), "Box_2");
    }

    #[test]
    fn test_automatic_keeps_duplicates() {
        let mut session = Session::default();
        let report = session.add_text("111 111").unwrap();
        assert!(report.duplicates.is_empty());
        assert_eq!(session.boxes()[0].payload(), "111\n111");
    }

    #[test]
    fn test_manual_rejects_duplicates_per_box() {
        let mut session = manual();
        assert_eq!(session.open_box("A").unwrap(), Lookup::Created);
        let report = session.add_text("111 222 111").unwrap();
        assert_eq!(report.added, ids(&["111", "222"]));
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.duplicates[0].box_name, "A");

        session.open_box("B").unwrap();
        session.add_text("111").unwrap();
        assert_eq!(session.find("A").unwrap().items(), ids(&["111", "222"]).as_slice());
        assert_eq!(session.find("B").unwrap().items(), ids(&["111"]).as_slice());

        assert_eq!(session.open_box("A").unwrap(), Lookup::Found);
        assert_eq!(session.boxes().len(), 2);
    }

    #[test]
    fn test_manual_without_active_box() {
        let mut session = manual();
        let res = session.add_text("111");
        assert!(matches!(res, Err(Error::Validation(ValidationError::NoActiveBox))));
        assert!(session.boxes().is_empty());
    }

    #[test]
    fn test_manual_capacity() {
        let config =
            SessionConfig { policy: Policy::Manual, manual_capacity: Some(2), ..Default::default() };
        let mut session = Session::new(config);
        session.open_box("A").unwrap();
        session.add_text("1 1 2").unwrap();
        let res = session.add_text("2 3");
        assert!(matches!(res, Err(Error::Validation(ValidationError::BoxFull { capacity: 2, .. }))));
        assert_eq!(session.find("A").unwrap().len(), 2);
    }

    #[test]
    fn test_select() {
        let mut session = manual();
        assert!(matches!(
            session.select("A"),
            Err(Error::Validation(ValidationError::UnknownBox(_)))
        ));
        session.open_box("A").unwrap();
        session.open_box("B").unwrap();
        session.select("A").unwrap();
        session.add_text("5").unwrap();
        assert_eq!(session.active_box().unwrap().name(), "A");
        assert_eq!(session.find("A").unwrap().last().unwrap().as_str(), "5");
    }

    #[test]
    fn test_open_box_requires_manual_policy() {
        let mut session = Session::default();
        assert!(matches!(
            session.open_box("A"),
            Err(Error::Validation(ValidationError::ManualOnly))
        ));
    }

    #[test]
    fn test_empty_input() {
        let mut session = Session::default();
        let res = session.add_text("no digits here");
        assert!(matches!(res, Err(Error::Validation(ValidationError::EmptyInput))));
        assert!(session.boxes().is_empty());
    }

    #[test]
    fn test_load_bulk_replaces_boxes() {
        let mut session = Session::default();
        session.add_text("999").unwrap();
        let count = session.load_bulk(ids(&["111", "222", "111"])).unwrap();
        assert_eq!(count, 2);
        assert_eq!(session.boxes()[0].name(), "111");
        assert_eq!(session.boxes()[1].payload(), "222");
        assert!(session.find("Box_1").is_none());
    }

    #[test]
    fn test_clear_keeps_metadata() {
        let mut session = Session::default();
        session.set_product_code("NCE-1");
        session.add_text("1 2 3").unwrap();
        session.clear();
        assert!(session.boxes().is_empty());
        assert_eq!(session.counter(), 1);
        assert_eq!(session.product_code(), "NCE-1");
    }

    #[test]
    fn test_summary() {
        let mut session = Session::default();
        session.add_text("111 222").unwrap();
        let summary = session.summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].to_string(), "Box_1 (2 IMEIs)\n  111\n  222\n");
    }
}


// Global constants
//------------------------------------------------------------------------------

pub const DEFAULT_BOX_CAPACITY: usize = 50;

pub const DEFAULT_BOX_PREFIX: &str = "Box_";
