//! Container names and login credentials

use crate::labels::{ManagedLabels, MANAGED_FILTER};
use burrow_provider::ContainerEngine;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use std::collections::HashSet;

/// Random draws tried before falling back to a suffixed name
pub const NAME_PROBES: usize = 15;

/// Word list for container names
pub const ANIMALS: [&str; 30] = [
    "lizard", "otter", "badger", "falcon", "tiger", "panda", "lemur", "gecko", "wolf", "eagle",
    "koala", "bison", "manta", "lynx", "sloth", "wren", "orca", "yak", "cobra", "ferret",
    "quokka", "heron", "raven", "moose", "viper", "fox", "marmot", "ibis", "puma", "coyote",
];

fn random_word<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    ANIMALS[rng.gen_range(0..ANIMALS.len())]
}

/// Pick a name not in `used`.
///
/// After [`NAME_PROBES`] colliding draws, a fresh draw gets a random
/// 4-hex-digit suffix instead of retrying further.
pub fn pick_name<R: Rng + ?Sized>(used: &HashSet<String>, rng: &mut R) -> String {
    for _ in 0..NAME_PROBES {
        let candidate = random_word(rng);
        if !used.contains(candidate) {
            return candidate.to_string();
        }
    }
    let mut suffix = [0u8; 2];
    rng.fill_bytes(&mut suffix);
    format!("{}-{}", random_word(rng), hex::encode(suffix))
}

/// Names held by running managed containers.
///
/// Both the recorded SSH name and the engine-level container name count.
/// A failed listing yields an empty set; the engine still rejects a
/// duplicate at launch.
pub async fn used_names(engine: &dyn ContainerEngine) -> HashSet<String> {
    match engine.list(MANAGED_FILTER).await {
        Ok(containers) => containers
            .into_iter()
            .flat_map(|c| {
                let ssh_name = ManagedLabels::from_labels(&c.labels)
                    .ok()
                    .map(|labels| labels.ssh_name);
                [Some(c.name), ssh_name]
            })
            .flatten()
            .filter(|n| !n.is_empty())
            .collect(),
        Err(e) => {
            tracing::warn!("Could not list containers for name allocation: {}", e);
            HashSet::new()
        }
    }
}

/// Allocate a container name against a fresh snapshot of used names
pub async fn allocate_name(engine: &dyn ContainerEngine) -> String {
    let used = used_names(engine).await;
    pick_name(&used, &mut rand::thread_rng())
}

/// Random login password: 16 bytes from the OS RNG, hex encoded
pub fn generate_password() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
