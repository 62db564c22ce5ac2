//! The settings-registration tree other firmware subsystems read
//! acquired configuration from.

use fxhash::FxHashMap;

use std::io::Result;
use std::sync::{Arc, Mutex};

use netboot_types::dhcp::DhcpTag;

/// A keyed source of configuration values.
///
/// Implementors expose the options of one acquisition (e.g. a received
/// DHCP packet) without the consumer knowing where they came from.
pub trait SettingsProvider: Send + Sync {
    /// Stores a value under `tag`.
    ///
    /// # Errors
    ///
    /// Fails if the provider cannot hold the value.
    fn store(&self, tag: DhcpTag, value: &[u8]) -> Result<()>;

    /// Copies the value of `tag` into `buf`, returning the full value
    /// length (which may exceed `buf.len()`).
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` if the provider has no value for `tag`.
    fn fetch(&self, tag: DhcpTag, buf: &mut [u8]) -> Result<usize>;
}

#[derive(Default)]
struct Scope {
    provider: Option<Arc<dyn SettingsProvider>>,
    children: FxHashMap<String, Scope>,
}

impl Scope {
    fn find(&self, name: &str) -> Option<&Scope> {
        if let Some(child) = self.children.get(name) {
            return Some(child);
        }
        self.children.values().find_map(|child| child.find(name))
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Scope> {
        if self.children.contains_key(name) {
            return self.children.get_mut(name);
        }
        self.children
            .values_mut()
            .find_map(|child| child.find_mut(name))
    }

    fn remove(&mut self, name: &str) -> bool {
        if self.children.remove(name).is_some() {
            return true;
        }
        self.children.values_mut().any(|child| child.remove(name))
    }
}

/// A tree of named settings scopes shared across sessions.
///
/// Cloning the handle yields another reference to the same tree.
/// Registration replaces an existing scope of the same name, so repeated
/// acquisitions supersede their predecessors.
#[derive(Clone, Default)]
pub struct SettingsTree {
    root: Arc<Mutex<Scope>>,
}

impl SettingsTree {
    #[must_use]
    pub fn new() -> SettingsTree {
        SettingsTree::default()
    }

    /// Registers `provider` under `name`, inside the scope `parent` (or
    /// at the root). A missing parent scope is created; an existing
    /// registration of the same name is replaced.
    pub fn register(
        &self,
        parent: Option<&str>,
        name: &str,
        provider: Arc<dyn SettingsProvider>,
    ) -> Result<()> {
        let mut root = self.root.lock().expect("settings tree poisoned");
        let scope = match parent {
            Some(parent) => {
                if root.find(parent).is_none() {
                    root.children.insert(parent.to_string(), Scope::default());
                }
                root.find_mut(parent).expect("parent scope just created")
            }
            None => &mut *root,
        };
        let child = scope.children.entry(name.to_string()).or_default();
        child.provider = Some(provider);
        Ok(())
    }

    /// Removes the first scope named `name`, returning whether one
    /// existed.
    pub fn unregister(&self, name: &str) -> bool {
        self.root
            .lock()
            .expect("settings tree poisoned")
            .remove(name)
    }

    /// Finds the provider registered under `name`, anywhere in the tree.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Arc<dyn SettingsProvider>> {
        self.root
            .lock()
            .expect("settings tree poisoned")
            .find(name)?
            .provider
            .clone()
    }
}
