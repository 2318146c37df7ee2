//! # Mock Framework
//!
//! Utilities for testing clients without a running actor.
//!
//! [`create_mock_client`] returns a client together with the receiving end of
//! its channel. The `expect_*` helpers pop the next request, assert its kind
//! and hand back the payload plus the responder, so a test can script the
//! actor's answer (success, rejection, or a dropped response).

use crate::actor_framework::{Entity, FrameworkError, ResourceClient, ResourceRequest};
use tokio::sync::{mpsc, oneshot};

pub type Responder<T> = oneshot::Sender<Result<T, FrameworkError>>;

pub fn create_mock_client<T: Entity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

pub async fn expect_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::CreateParams, Responder<T::Id>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

pub async fn expect_get<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Responder<Option<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

pub async fn expect_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Action, Responder<T::ActionResult>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, respond_to }) => Some((id, action, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{UserCreate, UserProfile};

    #[tokio::test]
    async fn test_mock_client_create() {
        let (client, mut receiver) = create_mock_client::<UserProfile>(10);

        let create_task = tokio::spawn(async move {
            let params = UserCreate {
                name: "Rahima".to_string(),
                email: "rahima@example.com".to_string(),
            };
            client.create(params).await
        });

        let (params, responder) = expect_create(&mut receiver).await.expect("Expected Create request");
        assert_eq!(params.name, "Rahima");
        responder.send(Ok("user_1".to_string())).unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(result, Ok("user_1".to_string()));
    }

    #[tokio::test]
    async fn test_dropped_responder_surfaces_as_error() {
        let (client, mut receiver) = create_mock_client::<UserProfile>(10);

        let get_task = tokio::spawn(async move { client.get("user_9".to_string()).await });

        let (id, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
        assert_eq!(id, "user_9");
        drop(responder);

        assert_eq!(get_task.await.unwrap(), Err(FrameworkError::ActorDropped));
    }
}
