//! The submission-ready deployment and the declarative file it can be read from.

use std::collections::BTreeMap;
use std::path::Path;

use facet::Facet;

use crate::error::GridCliError;
use crate::resolve::ResourceSpec;

/// Minimal base image every machine boots from.
pub const FLIST: &str = "https://hub.grid.tf/tf-official-apps/base:latest.flist";
pub const ENTRYPOINT: &str = "/sbin/zinit init";
pub const DESCRIPTION: &str = "Deployment deployed using the Grid-CLI tool.";

/// Environment variable the base image reads the authorized key from.
pub const SSH_KEY_ENV: &str = "SSH_KEY";

#[derive(Debug, Clone, PartialEq, Default, Facet)]
#[facet(default)]
pub struct NetworkSpec {
    pub name: String,
    pub ip_range: String,
}

#[derive(Debug, Clone, PartialEq, Default, Facet)]
#[facet(default)]
pub struct DiskSpec {
    pub name: String,
    #[facet(default)]
    pub mountpoint: String,
    /// GiB.
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Facet)]
#[facet(default)]
pub struct MachineSpec {
    pub name: String,
    pub node_id: u32,
    #[facet(default)]
    pub disks: Vec<DiskSpec>,
    pub cpu: u32,
    /// MiB.
    pub memory: u64,
    #[facet(default)]
    pub public_ip: bool,
    #[facet(default)]
    pub public_ip6: bool,
    #[facet(default)]
    pub planetary: bool,
    #[facet(default)]
    pub mycelium: bool,
    /// GiB, grid default when absent.
    pub rootfs_size: Option<f64>,
    #[facet(default)]
    pub flist: String,
    #[facet(default)]
    pub entrypoint: String,
    #[facet(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Default, Facet)]
#[facet(default)]
pub struct DeploymentDescriptor {
    pub name: String,
    pub network: NetworkSpec,
    #[facet(default)]
    pub machines: Vec<MachineSpec>,
    #[facet(default)]
    pub description: String,
    pub metadata: Option<String>,
}

impl DeploymentDescriptor {
    /// Stamp boot image, entrypoint, SSH key and provenance onto every
    /// machine. Everything else is left as it came in.
    pub fn inject_boot_metadata(&mut self, ssh_key: &str) {
        self.description = DESCRIPTION.to_string();
        for machine in &mut self.machines {
            machine.flist = FLIST.to_string();
            machine.entrypoint = ENTRYPOINT.to_string();
            machine
                .env
                .insert(SSH_KEY_ENV.to_string(), ssh_key.to_string());
        }
    }

    pub fn to_json(&self) -> String {
        facet_json::to_string(self).unwrap_or_else(|e| format!("<unserializable: {e}>"))
    }
}

/// MiB for a GiB amount, rounded to the nearest whole MiB.
pub fn memory_mib(memory_gib: f64) -> u64 {
    (memory_gib * 1024.0).round() as u64
}

/// The descriptor for a single machine described by `spec` on `node_id`.
///
/// Pure: the same inputs always produce the same descriptor.
pub fn build(spec: &ResourceSpec, node_id: u32, ssh_key: &str) -> DeploymentDescriptor {
    let machine = MachineSpec {
        name: spec.machine_name.clone(),
        node_id,
        disks: vec![DiskSpec {
            name: spec.disk_name.clone(),
            mountpoint: spec.disk_mountpoint.clone(),
            size: spec.disk_gib,
        }],
        cpu: spec.cpu_cores,
        memory: memory_mib(spec.memory_gib),
        public_ip: spec.connectivity.public_ipv4,
        public_ip6: spec.connectivity.public_ipv6,
        planetary: spec.connectivity.planetary,
        mycelium: spec.connectivity.mycelium,
        rootfs_size: None,
        ..MachineSpec::default()
    };

    let mut descriptor = DeploymentDescriptor {
        name: spec.machine_name.clone(),
        network: NetworkSpec {
            name: spec.network_name.clone(),
            ip_range: spec.network_ip_range.clone(),
        },
        machines: vec![machine],
        description: String::new(),
        metadata: None,
    };
    descriptor.inject_boot_metadata(ssh_key);
    descriptor
}

/// Read a deployment file. Its contents are trusted as already resolved;
/// only the shape is checked.
///
/// Scalars follow YAML 1.1: bare `y`, `n`, `yes`, `off` and friends are
/// booleans, so names like that must be quoted.
pub fn load_deployment_file(path: &Path) -> Result<DeploymentDescriptor, GridCliError> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| GridCliError::DeploymentFileLoad {
            path: path.display().to_string(),
            source,
        })?;

    let descriptor: DeploymentDescriptor =
        facet_yaml::from_str(&contents).map_err(|e| GridCliError::DeploymentFileParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    if descriptor.machines.is_empty() {
        return Err(GridCliError::DeploymentFileParse {
            path: path.display().to_string(),
            message: "`machines` must list at least one machine".into(),
        });
    }
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Connectivity;

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAILM+rvN+ot98qgEN796jTiQfZfG1KaT0PtFDJ/XFSqti user@example.com";

    fn spec() -> ResourceSpec {
        ResourceSpec {
            machine_name: "vmabc1234".into(),
            network_name: "netabcde".into(),
            network_ip_range: "10.10.0.0/16".into(),
            disk_name: "dskabcd".into(),
            disk_mountpoint: "/mnt/data".into(),
            disk_gib: 10.0,
            cpu_cores: 2,
            memory_gib: 4.0,
            connectivity: Connectivity {
                mycelium: true,
                public_ipv4: true,
                ..Connectivity::default()
            },
            node_id: None,
        }
    }

    #[test]
    fn build_is_deterministic() {
        let a = build(&spec(), 11, KEY);
        let b = build(&spec(), 11, KEY);
        assert_eq!(a, b);
        assert_eq!(a.to_json(), b.to_json());
    }

    #[test]
    fn build_maps_resources_and_connectivity() {
        let d = build(&spec(), 11, KEY);
        assert_eq!(d.name, "vmabc1234");
        assert_eq!(d.network.name, "netabcde");
        assert_eq!(d.description, DESCRIPTION);
        assert_eq!(d.metadata, None);

        let m = &d.machines[0];
        assert_eq!(m.node_id, 11);
        assert_eq!(m.cpu, 2);
        assert_eq!(m.memory, 4096);
        assert_eq!(m.disks.len(), 1);
        assert_eq!(m.disks[0].size, 10.0);
        assert_eq!(m.disks[0].mountpoint, "/mnt/data");
        assert!(m.public_ip);
        assert!(m.mycelium);
        assert!(!m.public_ip6);
        assert!(!m.planetary);
        assert_eq!(m.flist, FLIST);
        assert_eq!(m.entrypoint, ENTRYPOINT);
        assert_eq!(m.env.get(SSH_KEY_ENV).map(String::as_str), Some(KEY));
    }

    #[test]
    fn memory_rounds_to_whole_mib() {
        assert_eq!(memory_mib(2.0), 2048);
        assert_eq!(memory_mib(1.5), 1536);
        assert_eq!(memory_mib(1.0001), 1024);
    }

    #[test]
    fn injection_keeps_file_fields() {
        let mut d = DeploymentDescriptor {
            name: "fromfile".into(),
            machines: vec![
                MachineSpec {
                    name: "a".into(),
                    cpu: 3,
                    rootfs_size: Some(2.0),
                    ..MachineSpec::default()
                },
                MachineSpec {
                    name: "b".into(),
                    ..MachineSpec::default()
                },
            ],
            metadata: Some("team=infra".into()),
            ..DeploymentDescriptor::default()
        };
        d.inject_boot_metadata(KEY);

        assert_eq!(d.description, DESCRIPTION);
        assert_eq!(d.metadata.as_deref(), Some("team=infra"));
        assert_eq!(d.machines[0].cpu, 3);
        assert_eq!(d.machines[0].rootfs_size, Some(2.0));
        for m in &d.machines {
            assert_eq!(m.flist, FLIST);
            assert_eq!(m.env[SSH_KEY_ENV], KEY);
        }
    }

    #[test]
    fn loads_yaml_deployment_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployment.yaml");
        std::fs::write(
            &path,
            r#"name: webfarm
network:
  name: farmnet
  ip_range: 10.20.0.0/16
machines:
  - name: web1
    node_id: 14
    disks:
      - name: data
        mountpoint: /srv
        size: 20.0
    cpu: 2
    memory: 2048
    public_ip: true
    mycelium: true
description: ignored
"#,
        )
        .unwrap();

        let d = load_deployment_file(&path).unwrap();
        assert_eq!(d.name, "webfarm");
        assert_eq!(d.network.ip_range, "10.20.0.0/16");
        assert_eq!(d.machines.len(), 1);
        let m = &d.machines[0];
        assert_eq!(m.node_id, 14);
        assert_eq!(m.memory, 2048);
        assert_eq!(m.disks[0].size, 20.0);
        assert!(m.public_ip);
        assert!(!m.planetary);
    }

    #[test]
    fn file_without_machines_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "name: nothing\nnetwork:\n  name: net1\n  ip_range: 10.0.0.0/8\n")
            .unwrap();
        assert!(matches!(
            load_deployment_file(&path),
            Err(GridCliError::DeploymentFileParse { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        assert!(matches!(
            load_deployment_file(Path::new("/nonexistent/deployment.yaml")),
            Err(GridCliError::DeploymentFileLoad { .. })
        ));
    }

    #[test]
    fn bare_yaml_boolean_names_must_be_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let file = |name: &str| {
            format!(
                "name: d\nnetwork:\n  name: {name}\n  ip_range: 10.20.0.0/16\nmachines:\n  - name: vm1\n    node_id: 1\n    cpu: 1\n    memory: 1024\n"
            )
        };

        let bare = dir.path().join("bare.yaml");
        std::fs::write(&bare, file("n")).unwrap();
        assert!(matches!(
            load_deployment_file(&bare),
            Err(GridCliError::DeploymentFileParse { .. })
        ));

        let quoted = dir.path().join("quoted.yaml");
        std::fs::write(&quoted, file("\"n\"")).unwrap();
        assert_eq!(load_deployment_file(&quoted).unwrap().network.name, "n");
    }
}
