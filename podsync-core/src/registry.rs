//! In-memory spec registry shared between the orchestrator and RPC readers.
//!
//! The registry is the single synchronization point for the [`SpecList`]:
//! every mutation and every snapshot goes through the one lock, so an RPC
//! reader can never observe a half-mutated spec.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::RegistryError;
use crate::types::{RemoteContainer, Service, Spec, SpecDetails, SpecList, Status};

/// Cheaply cloneable handle to the shared [`SpecList`].
///
/// Clones share the same underlying list; hand one to the RPC server and
/// keep one in the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct SpecRegistry {
    inner: Arc<RwLock<SpecList>>,
}

impl SpecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still holds a structurally valid SpecList (writers
    // never leave an entry half-built), so recover the guard.
    fn read(&self) -> RwLockReadGuard<'_, SpecList> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SpecList> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new spec under `key` with no services and status `"init"`.
    pub fn add(&self, key: &str, details: SpecDetails) -> Result<(), RegistryError> {
        let mut list = self.write();
        if list.items.contains_key(key) {
            return Err(RegistryError::DuplicateKey {
                key: key.to_owned(),
            });
        }
        list.items.insert(key.to_owned(), Spec::new(details));
        Ok(())
    }

    /// Remove the spec registered under `key`, along with all its services.
    pub fn remove(&self, key: &str) -> Result<(), RegistryError> {
        match self.write().items.remove(key) {
            Some(_) => Ok(()),
            None => Err(RegistryError::UnknownKey {
                key: key.to_owned(),
            }),
        }
    }

    /// Attach a remote binding to the spec under `key`.
    ///
    /// The service's back-reference is written from `key` here, so a list
    /// built through the registry can never contain an orphaned service.
    pub fn attach_service(
        &self,
        key: &str,
        remote_container: RemoteContainer,
    ) -> Result<(), RegistryError> {
        let mut list = self.write();
        let spec = list
            .items
            .get_mut(key)
            .ok_or_else(|| RegistryError::UnknownKey {
                key: key.to_owned(),
            })?;
        spec.services.items.push(Service {
            spec_key: key.to_owned(),
            remote_container,
            status: Status::default(),
        });
        Ok(())
    }

    /// Update the status of the spec under `key`.
    pub fn set_spec_status(&self, key: &str, status: Status) -> Result<(), RegistryError> {
        let mut list = self.write();
        let spec = list
            .items
            .get_mut(key)
            .ok_or_else(|| RegistryError::UnknownKey {
                key: key.to_owned(),
            })?;
        spec.status = status;
        Ok(())
    }

    /// Update the status of one service, addressed by its container id.
    pub fn set_service_status(
        &self,
        key: &str,
        container_id: &str,
        status: Status,
    ) -> Result<(), RegistryError> {
        let mut list = self.write();
        let spec = list
            .items
            .get_mut(key)
            .ok_or_else(|| RegistryError::UnknownKey {
                key: key.to_owned(),
            })?;
        let service = spec
            .services
            .items
            .iter_mut()
            .find(|s| s.remote_container.id == container_id)
            .ok_or_else(|| RegistryError::UnknownService {
                key: key.to_owned(),
                container_id: container_id.to_owned(),
            })?;
        service.status = status;
        Ok(())
    }

    /// Consistent point-in-time clone of the whole list.
    pub fn snapshot(&self) -> SpecList {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::STATUS_SYNCING;

    fn details(name: &str) -> SpecDetails {
        SpecDetails {
            name: name.to_owned(),
            container_name: name.to_owned(),
            pod_name: format!("{name}-0"),
            selector: String::new(),
            namespace: "default".to_owned(),
            local_path: "/src".into(),
            remote_path: "/app".into(),
            reload: true,
            local_read_only: false,
            remote_read_only: false,
        }
    }

    fn container(id: &str) -> RemoteContainer {
        RemoteContainer {
            id: id.to_owned(),
            container_name: "web".to_owned(),
            node_name: "node-a".to_owned(),
            pod_name: "web-0".to_owned(),
        }
    }

    #[test]
    fn add_rejects_duplicate_key() {
        let registry = SpecRegistry::new();
        registry.add("web", details("web")).expect("first add");
        let err = registry.add("web", details("web")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateKey {
                key: "web".to_owned()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_unknown_key_errors() {
        let registry = SpecRegistry::new();
        let err = registry.remove("ghost").unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownKey {
                key: "ghost".to_owned()
            }
        );
    }

    #[test]
    fn attach_writes_back_reference_from_key() {
        let registry = SpecRegistry::new();
        registry.add("web", details("web")).expect("add");
        registry
            .attach_service("web", container("c1"))
            .expect("attach");

        let snapshot = registry.snapshot();
        let service = &snapshot.items["web"].services.items[0];
        assert_eq!(service.spec_key, "web");
        assert!(service.status.is(crate::types::STATUS_INIT));
    }

    #[test]
    fn service_order_reflects_attachment_order() {
        let registry = SpecRegistry::new();
        registry.add("web", details("web")).expect("add");
        for id in ["c1", "c2", "c3"] {
            registry.attach_service("web", container(id)).expect("attach");
        }
        let ids: Vec<String> = registry.snapshot().items["web"]
            .services
            .items
            .iter()
            .map(|s| s.remote_container.id.clone())
            .collect();
        assert_eq!(ids, ["c1", "c2", "c3"]);
    }

    #[test]
    fn set_service_status_by_container_id() {
        let registry = SpecRegistry::new();
        registry.add("web", details("web")).expect("add");
        registry
            .attach_service("web", container("c1"))
            .expect("attach");
        registry
            .set_service_status("web", "c1", Status::from(STATUS_SYNCING))
            .expect("set status");

        let err = registry
            .set_service_status("web", "c9", Status::from(STATUS_SYNCING))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownService {
                key: "web".to_owned(),
                container_id: "c9".to_owned()
            }
        );

        let snapshot = registry.snapshot();
        assert!(snapshot.items["web"].services.items[0]
            .status
            .is(STATUS_SYNCING));
    }

    /// Concurrent readers must never observe a spec with details present but
    /// services/status missing; the lock makes each mutation atomic.
    #[test]
    fn concurrent_snapshots_never_tear() {
        let registry = SpecRegistry::new();
        registry.add("web", details("web")).expect("add");

        let writer = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    registry
                        .set_spec_status("web", Status::from(format!("round-{i}")))
                        .expect("status update");
                    registry
                        .attach_service("web", container(&format!("c{i}")))
                        .expect("attach");
                }
            })
        };

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = registry.snapshot();
                        let spec = &snapshot.items["web"];
                        // Every observed service must be fully formed.
                        for service in &spec.services.items {
                            assert_eq!(service.spec_key, "web");
                            assert!(!service.remote_container.id.is_empty());
                        }
                        assert!(!spec.status.0.is_empty());
                    }
                })
            })
            .collect();

        writer.join().expect("writer");
        for reader in readers {
            reader.join().expect("reader");
        }
        assert_eq!(
            registry.snapshot().items["web"].services.items.len(),
            200
        );
    }
}
