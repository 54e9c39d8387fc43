#[cfg(test)]
mod subscribe_tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::memory_cluster::InMemoryCluster;
    use crate::pod::{PodEvent, PodUid};
    use crate::test_support::pod;

    fn added_uids(events: &mut UnboundedReceiver<PodEvent>) -> HashSet<PodUid> {
        let mut uids = HashSet::new();
        while let Ok(event) = events.try_recv() {
            if let PodEvent::Added(pod) = event {
                uids.insert(pod.uid);
            }
        }
        uids
    }

    #[test]
    fn replays_existing_pods_then_publishes_new_ones() {
        let existing = pod("existing");
        let cluster = InMemoryCluster::with_snapshot(vec![], vec![existing.clone()]);

        let mut events = cluster.subscribe();
        let late = pod("late");
        cluster.add_pod(late.clone());

        assert_eq!(
            HashSet::from([existing.uid, late.uid]),
            added_uids(&mut events)
        );
    }

    #[test]
    fn pods_added_while_subscribing_are_never_lost() {
        for _ in 0..20 {
            let cluster = Arc::new(InMemoryCluster::new());

            let writer = {
                let cluster = Arc::clone(&cluster);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        cluster.add_pod(pod(&format!("web-{i}")));
                    }
                })
            };

            let mut subscriptions: Vec<_> = (0..20).map(|_| cluster.subscribe()).collect();
            writer.join().unwrap();

            let all: HashSet<_> = cluster
                .pending_pods("network-scheduler")
                .into_iter()
                .map(|pod| pod.uid)
                .collect();
            assert_eq!(200, all.len());

            for events in subscriptions.iter_mut() {
                assert_eq!(all, added_uids(events));
            }
        }
    }
}

#[cfg(test)]
mod bind_tests {
    use crate::binder::{BindError, BindingApi};
    use crate::memory_cluster::InMemoryCluster;
    use crate::node::Node;
    use crate::pod::{Binding, PodEvent};
    use crate::test_support::pod;

    #[tokio::test]
    async fn bind_updates_pod_and_publishes_it() {
        let web = pod("web");
        let cluster = InMemoryCluster::with_snapshot(vec![Node::new("a")], vec![web.clone()]);
        let mut events = cluster.subscribe();
        let _replayed = events.recv().await;

        cluster.bind(&Binding::new(&web, "a")).await.unwrap();

        assert_eq!(Some("a".to_owned()), cluster.pod(web.uid).unwrap().node_name);
        assert!(matches!(
            events.recv().await,
            Some(PodEvent::Updated(pod)) if pod.is_bound()
        ));
    }

    #[tokio::test]
    async fn second_bind_is_rejected() {
        let web = pod("web");
        let cluster = InMemoryCluster::with_snapshot(
            vec![Node::new("a"), Node::new("b")],
            vec![web.clone()],
        );

        cluster.bind(&Binding::new(&web, "a")).await.unwrap();

        assert_eq!(
            Err(BindError::AlreadyBound {
                pod: "default/web".to_owned(),
                node: "a".to_owned(),
            }),
            cluster.bind(&Binding::new(&web, "b")).await
        );
        assert_eq!(1, cluster.bindings().len());
    }

    #[tokio::test]
    async fn unknown_node_or_pod_is_rejected() {
        let web = pod("web");
        let cluster = InMemoryCluster::with_snapshot(vec![Node::new("a")], vec![]);

        assert_eq!(
            Err(BindError::NodeNotFound("missing".to_owned())),
            cluster.bind(&Binding::new(&web, "missing")).await
        );
        assert_eq!(
            Err(BindError::PodNotFound("default/web".to_owned())),
            cluster.bind(&Binding::new(&web, "a")).await
        );
    }
}
