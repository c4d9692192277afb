use std::sync::Arc;

use tinybeast_types::DictId;
use tokio::sync::RwLock;

pub type SharedRegistry = Arc<RwLock<DictionaryRegistry>>;

/// Static description of an installable dictionary
#[derive(Debug, Clone, Copy)]
pub struct CatalogItem {
    pub id: &'static str,
    pub name: &'static str,
    pub size_downloaded: &'static str,
    pub size_installed: &'static str,
}

pub const DEFAULT_CATALOG: &[CatalogItem] = &[
    CatalogItem { id: "en", name: "English", size_downloaded: "94 MB", size_installed: "621 MB" },
    CatalogItem { id: "fr", name: "French", size_downloaded: "25 MB", size_installed: "324 MB" },
    CatalogItem { id: "de", name: "German", size_downloaded: "41 MB", size_installed: "686 MB" },
    CatalogItem { id: "es", name: "Spanish", size_downloaded: "39 MB", size_installed: "617 MB" },
    CatalogItem { id: "it", name: "Italian", size_downloaded: "32 MB", size_installed: "424 MB" },
    CatalogItem { id: "fa", name: "Persian", size_downloaded: "3 MB", size_installed: "54 MB" },
    CatalogItem { id: "pt", name: "Portuguese", size_downloaded: "20 MB", size_installed: "279 MB" },
    CatalogItem { id: "zh-CN", name: "Chinese (Simplified)", size_downloaded: "47 MB", size_installed: "619 MB" },
    CatalogItem { id: "ar", name: "Arabic", size_downloaded: "20 MB", size_installed: "429 MB" },
];

/// Lifecycle state of a dictionary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictStatus {
    NotDownloaded,
    /// `None` until the backend reports its first percentage
    Downloading(Option<u8>),
    /// Local installation work, not cancelable
    Processing,
    Installed,
}

impl DictStatus {
    pub fn label(&self) -> String {
        match self {
            DictStatus::NotDownloaded => "not downloaded".to_string(),
            DictStatus::Downloading(None) => "initializing".to_string(),
            DictStatus::Downloading(Some(pct)) => format!("{pct}%"),
            DictStatus::Processing => "processing".to_string(),
            DictStatus::Installed => "installed".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DictionaryEntry {
    pub id: DictId,
    pub display_name: String,
    pub size_downloaded: String,
    pub size_installed: String,
    pub status: DictStatus,
    /// First-use message already shown in this process run
    pub bootstrapped: bool,
}

/// Id-keyed arena of dictionary entries plus the downloaded set and selection.
///
/// Writers: the lifecycle manager owns status, downloaded set and selection;
/// the orchestrator only flips `bootstrapped`.
#[derive(Debug, Clone)]
pub struct DictionaryRegistry {
    entries: Vec<DictionaryEntry>,
    downloaded: Vec<DictId>,
    selected: Option<DictId>,
}

impl Default for DictionaryRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG)
    }
}

impl DictionaryRegistry {
    pub fn new(catalog: &[CatalogItem]) -> Self {
        let entries = catalog
            .iter()
            .map(|item| DictionaryEntry {
                id: DictId::from(item.id),
                display_name: item.name.to_string(),
                size_downloaded: item.size_downloaded.to_string(),
                size_installed: item.size_installed.to_string(),
                status: DictStatus::NotDownloaded,
                bootstrapped: false,
            })
            .collect();

        Self {
            entries,
            downloaded: Vec::new(),
            selected: None,
        }
    }

    pub fn shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    pub fn get(&self, id: &DictId) -> Option<&DictionaryEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    fn get_mut(&mut self, id: &DictId) -> Option<&mut DictionaryEntry> {
        self.entries.iter_mut().find(|e| &e.id == id)
    }

    pub fn contains(&self, id: &DictId) -> bool {
        self.get(id).is_some()
    }

    pub fn status(&self, id: &DictId) -> Option<DictStatus> {
        self.get(id).map(|e| e.status)
    }

    pub fn is_installed(&self, id: &DictId) -> bool {
        self.status(id) == Some(DictStatus::Installed)
    }

    /// Installed dictionaries in installation order
    pub fn downloaded(&self) -> &[DictId] {
        &self.downloaded
    }

    pub fn selected(&self) -> Option<&DictId> {
        self.selected.as_ref()
    }

    /// Apply persisted state, dropping unknown ids and repairing the selection
    pub fn restore(&mut self, downloaded: &[DictId], selected: Option<&DictId>) {
        for id in downloaded {
            if self.downloaded.contains(id) {
                continue;
            }
            match self.get_mut(id) {
                Some(entry) => entry.status = DictStatus::Installed,
                None => {
                    tracing::warn!("Ignoring unknown downloaded dictionary '{id}'");
                    continue;
                }
            }
            self.downloaded.push(id.clone());
        }

        self.selected = selected.filter(|id| self.downloaded.contains(id)).cloned();
        self.repair_selection();
    }

    /// Selection and downloaded set agree with each other and with entry statuses
    pub fn is_consistent(&self) -> bool {
        let selection_ok = match &self.selected {
            None => self.downloaded.is_empty(),
            Some(id) => self.downloaded.contains(id),
        };

        let installed = self
            .entries
            .iter()
            .filter(|e| e.status == DictStatus::Installed)
            .count();
        let set_ok = installed == self.downloaded.len()
            && self.downloaded.iter().all(|id| self.is_installed(id));

        selection_ok && set_ok
    }

    pub(crate) fn set_status(&mut self, id: &DictId, status: DictStatus) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    /// Returns true when this call flipped the flag
    pub(crate) fn mark_bootstrapped(&mut self, id: &DictId) -> bool {
        match self.get_mut(id) {
            Some(entry) if !entry.bootstrapped => {
                entry.bootstrapped = true;
                true
            }
            _ => false,
        }
    }

    /// Mark installed and add to the downloaded set. Returns true if the selection changed.
    pub(crate) fn install(&mut self, id: &DictId) -> bool {
        if !self.set_status(id, DictStatus::Installed) {
            return false;
        }
        if !self.downloaded.contains(id) {
            self.downloaded.push(id.clone());
        }
        if self.selected.is_none() {
            self.selected = Some(id.clone());
            return true;
        }
        false
    }

    /// Mark not downloaded and drop from the downloaded set. Returns true if the selection changed.
    pub(crate) fn uninstall(&mut self, id: &DictId) -> bool {
        self.set_status(id, DictStatus::NotDownloaded);
        self.downloaded.retain(|d| d != id);
        self.repair_selection()
    }

    pub(crate) fn select(&mut self, id: &DictId) -> bool {
        if !self.downloaded.contains(id) {
            return false;
        }
        self.selected = Some(id.clone());
        true
    }

    fn repair_selection(&mut self) -> bool {
        let valid = self
            .selected
            .as_ref()
            .is_some_and(|id| self.downloaded.contains(id));
        if valid {
            return false;
        }

        let repaired = self.downloaded.first().cloned();
        let changed = repaired != self.selected;
        if changed {
            tracing::debug!("Selection repaired: {:?} -> {:?}", self.selected, repaired);
        }
        self.selected = repaired;
        changed
    }
}
