use crate::cli::DeployArgs;
use crate::descriptor::{self, DeploymentDescriptor};
use crate::error::GridCliError;
use crate::grid::{Grid, MachineRecord};
use crate::matcher;
use crate::profile::Profile;
use crate::progress::Progress;
use crate::prompt::Prompter;
use crate::resolve::{self, Defaults, ResourceSpec};

use super::{best_effort, disconnect_quietly, ensure_connected};

/// What was submitted and what the grid reports back about it.
#[derive(Debug)]
pub struct Deployment {
    pub descriptor: DeploymentDescriptor,
    pub machines: Vec<MachineRecord>,
}

enum Plan {
    /// Taken verbatim from a deployment file.
    File(DeploymentDescriptor),
    /// Resolved from flags, prompts and defaults; the node may still be open.
    Spec(ResourceSpec),
}

pub async fn deploy<G, P>(
    args: &DeployArgs,
    profile: &Profile,
    grid: &mut G,
    prompter: &mut P,
    progress: &Progress,
) -> Result<Deployment, GridCliError>
where
    G: Grid,
    P: Prompter + ?Sized,
{
    // Bad flags fail here, before the profile or the grid are consulted.
    let flags = args.flags();
    resolve::validate_flags(&flags)?;
    ensure_connected(profile)?;

    let plan = match args.deployment_file {
        Some(ref path) => {
            tracing::info!("deploying from configuration file {}", path.display());
            Plan::File(descriptor::load_deployment_file(path)?)
        }
        None => Plan::Spec(resolve::resolve(&flags, &Defaults::generate(), prompter)?),
    };

    let ssh_key = profile.ssh_key().unwrap_or_else(|| {
        tracing::warn!("no SSH key in the profile, the machine won't accept SSH logins");
        ""
    });

    tracing::info!("connecting your wallet");
    grid.connect().await?;
    tracing::info!("grid client connected successfully");

    let submitted = submit(grid, plan, ssh_key, progress).await;
    let descriptor = match submitted {
        Ok(descriptor) => descriptor,
        Err(e) => {
            // Nothing is rolled back; a contract may already exist on chain.
            disconnect_quietly(grid).await;
            return Err(e);
        }
    };

    tracing::info!("listing the deployment details");
    let machines = best_effort("deployment details", grid.machines(&descriptor.name).await)
        .unwrap_or_default();

    disconnect_quietly(grid).await;
    Ok(Deployment {
        descriptor,
        machines,
    })
}

/// Finish the descriptor on an open session and hand it to the grid.
async fn submit<G: Grid>(
    grid: &mut G,
    plan: Plan,
    ssh_key: &str,
    progress: &Progress,
) -> Result<DeploymentDescriptor, GridCliError> {
    tracing::info!("updating the deployment with the necessary data");
    let descriptor = match plan {
        Plan::File(mut descriptor) => {
            descriptor.inject_boot_metadata(ssh_key);
            descriptor
        }
        Plan::Spec(spec) => {
            let node_id = match spec.node_id {
                Some(node_id) => node_id,
                None => {
                    tracing::info!("filtering the grid nodes based on the requirements");
                    let session = &*grid;
                    let pool = progress
                        .run(
                            "Searching for a node",
                            session.nodes(&matcher::candidate_filter()),
                        )
                        .await?;
                    matcher::match_node(&spec, &pool)?
                }
            };
            tracing::info!("using node ID: {node_id}");
            descriptor::build(&spec, node_id, ssh_key)
        }
    };
    tracing::debug!(
        "deployment configuration prepared: {}",
        descriptor.to_json()
    );

    tracing::info!("deploying...");
    progress
        .run("Deploying", grid.deploy(&descriptor))
        .await?;
    tracing::info!("deployed");
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::testing::{FakeGrid, node};
    use crate::profile::tests::{TEST_SSH_KEY, connected_profile};
    use crate::prompt::DefaultsPrompter;
    use crate::resolve::NetworkAccess;

    fn grid_with(nodes: Vec<crate::grid::CapacityNode>) -> FakeGrid {
        FakeGrid {
            twin: Some(1),
            nodes,
            ..FakeGrid::default()
        }
    }

    async fn run(args: &DeployArgs, grid: &mut FakeGrid) -> Result<Deployment, GridCliError> {
        deploy(
            args,
            &connected_profile(),
            grid,
            &mut DefaultsPrompter,
            &Progress::hidden(),
        )
        .await
    }

    #[tokio::test]
    async fn resolves_matches_and_deploys() {
        let mut capable = node(21, 4, 8, 20);
        capable.has_public_ipv4 = true;
        let mut grid = grid_with(vec![capable]);
        let args = DeployArgs {
            cpu: Some("2 Core".into()),
            memory: Some("4GB".into()),
            disk_space: Some("10GB".into()),
            network_access: Some(vec![NetworkAccess::Mycelium, NetworkAccess::PublicIpv4]),
            ..DeployArgs::default()
        };

        let deployment = run(&args, &mut grid).await.unwrap();
        let m = &deployment.descriptor.machines[0];
        assert_eq!(m.cpu, 2);
        assert_eq!(m.memory, 4096);
        assert_eq!(m.disks[0].size, 10.0);
        assert_eq!(m.node_id, 21);
        assert!(m.public_ip);
        assert!(m.mycelium);
        assert!(!m.public_ip6);
        assert!(!m.planetary);
        assert_eq!(m.env["SSH_KEY"], TEST_SSH_KEY);

        assert_eq!(grid.deployed.len(), 1);
        assert_eq!(deployment.machines.len(), 1);
        assert_eq!(deployment.machines[0].node_id, 21);
        assert!(deployment.machines[0].public_ip.is_some());
        assert_eq!(grid.disconnects, 1);
    }

    #[tokio::test]
    async fn invalid_flag_fails_before_any_grid_call() {
        let mut grid = grid_with(vec![node(1, 8, 16, 100)]);
        let args = DeployArgs {
            disk_space: Some("60GB".into()),
            ..DeployArgs::default()
        };

        let err = run(&args, &mut grid).await.unwrap_err();
        assert!(err.to_string().contains("lower than 50GB"));
        assert_eq!(grid.connects, 0);
        assert_eq!(grid.node_queries.get(), 0);
    }

    #[tokio::test]
    async fn pinned_node_skips_the_capacity_query() {
        let mut grid = grid_with(Vec::new());
        let args = DeployArgs {
            node_id: Some("77".into()),
            ..DeployArgs::default()
        };

        let deployment = run(&args, &mut grid).await.unwrap();
        assert_eq!(deployment.descriptor.machines[0].node_id, 77);
        assert_eq!(grid.node_queries.get(), 0);
    }

    #[tokio::test]
    async fn no_capacity_means_no_submission() {
        let mut grid = grid_with(vec![node(1, 1, 1, 5)]);
        let args = DeployArgs {
            cpu: Some("4".into()),
            ..DeployArgs::default()
        };

        let err = run(&args, &mut grid).await.unwrap_err();
        assert!(matches!(err, GridCliError::NoMatchingNode { .. }));
        assert!(grid.deployed.is_empty());
        assert_eq!(grid.disconnects, 1);
    }

    #[tokio::test]
    async fn failed_submission_still_disconnects() {
        let mut grid = grid_with(vec![node(1, 8, 16, 100)]);
        grid.fail_deploy = true;

        let err = run(&DeployArgs::default(), &mut grid).await.unwrap_err();
        assert!(matches!(err, GridCliError::ExternalSession { .. }));
        assert_eq!(grid.disconnects, 1);
    }

    #[tokio::test]
    async fn unlinked_profile_is_rejected_before_connecting() {
        let mut grid = grid_with(vec![node(1, 8, 16, 100)]);
        let err = deploy(
            &DeployArgs::default(),
            &Profile::default(),
            &mut grid,
            &mut DefaultsPrompter,
            &Progress::hidden(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GridCliError::NotConnected));
        assert_eq!(grid.connects, 0);
    }

    #[tokio::test]
    async fn deployment_file_bypasses_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployment.yaml");
        // cpu 9 would fail the flag validators; files are trusted as-is.
        std::fs::write(
            &path,
            r#"name: batch
network:
  name: batchnet
  ip_range: 10.30.0.0/16
machines:
  - name: worker1
    node_id: 5
    cpu: 9
    memory: 4096
    planetary: true
  - name: worker2
    node_id: 6
    cpu: 1
    memory: 1024
"#,
        )
        .unwrap();
        let mut grid = grid_with(Vec::new());
        let args = DeployArgs {
            deployment_file: Some(path),
            ..DeployArgs::default()
        };

        let deployment = run(&args, &mut grid).await.unwrap();
        let d = &deployment.descriptor;
        assert_eq!(d.machines.len(), 2);
        assert_eq!(d.machines[0].cpu, 9);
        assert_eq!(d.description, descriptor::DESCRIPTION);
        assert!(d.machines.iter().all(|m| m.flist == descriptor::FLIST));
        assert_eq!(grid.node_queries.get(), 0);
        assert_eq!(deployment.machines.len(), 2);
    }
}
