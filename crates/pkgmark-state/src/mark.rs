use tracing::{debug, info};

use crate::types::MarkFlag;
use crate::{
    validate_package_name, InstallReceipt, MarkError, MarkIntent, MarkOutcome, MetadataStore,
};

/// Applies `intent` to one receipt, writing it back at most once.
///
/// Both flags are compared against the receipt as loaded, so an intent that
/// flips both reports both as changed. Nothing is written when every
/// requested flag already holds the requested value.
pub fn apply_mark<S: MetadataStore>(
    store: &S,
    receipt: &mut InstallReceipt,
    intent: MarkIntent,
) -> Result<MarkOutcome, MarkError> {
    if !store.record_exists(&receipt.name) {
        return Err(MarkError::MissingRecord {
            name: receipt.name.clone(),
            path: store.record_location(&receipt.name),
        });
    }

    let requested = [
        (MarkFlag::OnRequest, intent.on_request()),
        (MarkFlag::AsDependency, intent.as_dependency()),
    ];

    let mut outcome = MarkOutcome {
        name: receipt.name.clone(),
        ..MarkOutcome::default()
    };
    let mut updates = Vec::with_capacity(requested.len());
    for (flag, target) in requested {
        let Some(target) = target else {
            continue;
        };
        let current = flag.current(receipt);
        let label = flag.label(target);
        debug!(
            package = %receipt.name,
            flag = flag.receipt_key(),
            current,
            target,
            "compare flag"
        );
        if current ^ target {
            outcome.changed.push(label);
            updates.push((flag, target));
        } else {
            outcome.unchanged.push(label);
        }
    }

    if updates.is_empty() {
        debug!(package = %receipt.name, "receipt already matches; skipping write");
        return Ok(outcome);
    }

    let mut updated = receipt.clone();
    for (flag, target) in updates {
        flag.assign(&mut updated, target);
    }
    store
        .write_record(&updated)
        .map_err(|source| MarkError::Persistence {
            name: receipt.name.clone(),
            source,
        })?;
    *receipt = updated;
    info!(package = %receipt.name, changed = ?outcome.changed, "install receipt updated");

    Ok(outcome)
}

/// Fails with the first package in `names` that is not installed. A name that
/// cannot be a package directory counts as not installed.
pub fn ensure_all_installed<S: MetadataStore>(
    store: &S,
    names: &[String],
) -> Result<(), MarkError> {
    for name in names {
        if let Err(err) = validate_package_name(name) {
            debug!(package = %name, error = %err, "rejecting package name");
            return Err(MarkError::NotInstalled { name: name.clone() });
        }
        if !store.is_installed(name)? {
            return Err(MarkError::NotInstalled { name: name.clone() });
        }
    }
    Ok(())
}

pub fn apply_mark_to_all<S: MetadataStore>(
    store: &S,
    names: &[String],
    intent: MarkIntent,
) -> Result<Vec<MarkOutcome>, MarkError> {
    apply_mark_to_all_with(store, names, intent, |_| {})
}

/// Marks every package in input order, handing each outcome to `on_outcome`
/// as soon as it is final. The first error stops the batch; packages already
/// written stay written.
pub fn apply_mark_to_all_with<S, F>(
    store: &S,
    names: &[String],
    intent: MarkIntent,
    mut on_outcome: F,
) -> Result<Vec<MarkOutcome>, MarkError>
where
    S: MetadataStore,
    F: FnMut(&MarkOutcome),
{
    ensure_all_installed(store, names)?;

    let mut outcomes = Vec::with_capacity(names.len());
    for name in names {
        let _guard = store.lock_package(name)?;
        if !store.record_exists(name) {
            return Err(MarkError::MissingRecord {
                name: name.clone(),
                path: store.record_location(name),
            });
        }

        let mut receipt = store.load_record(name)?;
        let outcome = apply_mark(store, &mut receipt, intent)?;
        on_outcome(&outcome);
        outcomes.push(outcome);
    }

    Ok(outcomes)
}
