use crate::error::GridCliError;
use crate::grid::Grid;
use crate::profile::{Profile, ProfileStore, is_known};

use super::{best_effort, disconnect_quietly, ensure_connected};

/// Fill in every placeholder field the grid can tell us about and save.
pub async fn run<G, S>(grid: &mut G, mut profile: Profile, store: &S) -> Result<Profile, GridCliError>
where
    G: Grid,
    S: ProfileStore,
{
    ensure_connected(&profile)?;

    tracing::info!("connecting your wallet");
    grid.connect().await?;
    tracing::info!("grid client connected successfully");

    if !is_known(&profile.twin_id) {
        if let Some(twin) = best_effort("twin ID", grid.twin_id().await) {
            profile.twin_id = twin.to_string();
        }
    }

    let need_key = !is_known(&profile.ssh_key);
    let need_balance = !is_known(&profile.balance);

    // Disjoint fields, so the two lookups run together.
    let session = &*grid;
    let (ssh_key, balance) = tokio::join!(
        async {
            if need_key {
                best_effort("SSH key", session.ssh_key().await)
            } else {
                None
            }
        },
        async {
            if need_balance {
                best_effort("balance", session.balance().await)
            } else {
                None
            }
        },
    );
    if let Some(Some(key)) = ssh_key {
        profile.ssh_key = key;
    }
    if let Some(balance) = balance {
        profile.balance = balance;
    }

    disconnect_quietly(grid).await;

    store.save(&profile)?;
    Ok(profile)
}
