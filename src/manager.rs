use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};

use ff_publisher::{CapabilitySet, Completion, Publisher, TranscoderSettings};
use tokio::sync::{Mutex, RwLock};

type SharedPublisher = Arc<Mutex<Publisher>>;

static PUBLISHER_MANAGER: LazyLock<RwLock<HashMap<String, SharedPublisher>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

pub(crate) fn get_publisher_manager() -> &'static RwLock<HashMap<String, SharedPublisher>> {
    &PUBLISHER_MANAGER
}

/// Start a publisher and register it under `id`. The publisher releases its
/// sessions and is unregistered once its transcoder run ends.
pub(crate) async fn add_publisher(
    id: &str,
    url: &str,
    capabilities: CapabilitySet,
    transcoder: TranscoderSettings,
) -> anyhow::Result<()> {
    let mut publishers = PUBLISHER_MANAGER.write().await;
    if publishers.contains_key(id) {
        return Err(anyhow::anyhow!("Publisher already exists"));
    }

    let mut publisher = Publisher::new(id, url, capabilities).with_transcoder(transcoder);
    let mut completion = publisher.start()?;
    let publisher = Arc::new(Mutex::new(publisher));
    publishers.insert(id.to_string(), Arc::clone(&publisher));
    drop(publishers);

    let id = id.to_string();
    tokio::spawn(async move {
        match completion.recv().await {
            Some(Completion::Exited) => log::info!("Manager: publisher {} finished", id),
            Some(Completion::Failed(e)) => {
                log::error!("Manager: publisher {} failed: {}", id, e)
            }
            None => log::warn!("Manager: publisher {} completion channel closed", id),
        }

        {
            let mut publishers = PUBLISHER_MANAGER.write().await;
            // the id may have been reused by a newer publisher
            if publishers
                .get(&id)
                .is_some_and(|p| Arc::ptr_eq(p, &publisher))
            {
                publishers.remove(&id);
            }
        }
        publisher.lock().await.finish();
    });
    Ok(())
}

pub(crate) async fn remove_publisher(id: &str) -> anyhow::Result<()> {
    let publisher = PUBLISHER_MANAGER.write().await.remove(id);
    match publisher {
        Some(publisher) => {
            publisher.lock().await.stop().await;
            Ok(())
        }
        None => Err(anyhow::anyhow!("Publisher not found")),
    }
}

pub(crate) async fn get_publisher(id: &str) -> Option<SharedPublisher> {
    PUBLISHER_MANAGER.read().await.get(id).cloned()
}

pub(crate) async fn stop_all() {
    let publishers: Vec<_> = PUBLISHER_MANAGER.write().await.drain().collect();
    for (id, publisher) in publishers {
        log::info!("Manager: stopping publisher {}", id);
        publisher.lock().await.stop().await;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use ff_publisher::{Capability, CodecCapability};

    use super::*;

    fn capabilities() -> CapabilitySet {
        let mut caps = CapabilitySet::new();
        caps.insert(
            "video".to_string(),
            Capability::new().with_codec(CodecCapability::h264(96)),
        );
        caps.insert(
            "audio".to_string(),
            Capability::new().with_codec(CodecCapability::opus(111)),
        );
        caps
    }

    fn wait_for_quit() -> TranscoderSettings {
        TranscoderSettings::new("sh").with_pre_args(["-c", "read line", "sh"])
    }

    #[tokio::test]
    async fn test_add_and_remove_publisher() -> anyhow::Result<()> {
        add_publisher("manager-a", "rtmp://example/live", capabilities(), wait_for_quit()).await?;
        assert!(get_publisher("manager-a").await.is_some());

        let duplicate =
            add_publisher("manager-a", "rtmp://example/live", capabilities(), wait_for_quit()).await;
        assert!(duplicate.is_err());

        remove_publisher("manager-a").await?;
        assert!(get_publisher("manager-a").await.is_none());
        assert!(remove_publisher("manager-a").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_finished_publisher_is_unregistered() -> anyhow::Result<()> {
        add_publisher(
            "manager-b",
            "rtmp://example/live",
            capabilities(),
            TranscoderSettings::new("true"),
        )
        .await?;

        let mut removed = false;
        for _ in 0..50 {
            if get_publisher("manager-b").await.is_none() {
                removed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(removed);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_capabilities_are_not_registered() {
        let mut caps = capabilities();
        caps.remove("video");

        let res = add_publisher("manager-c", "rtmp://example/live", caps, wait_for_quit()).await;
        assert!(res.is_err());
        assert!(get_publisher("manager-c").await.is_none());
    }
}
