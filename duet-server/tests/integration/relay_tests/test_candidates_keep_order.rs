use duet_core::{ClientMessage, IceCandidate, ServerMessage};

use crate::integration::{create_test_hub, init_tracing};
use crate::utils::{send_signal, sync};

#[tokio::test]
async fn test_candidates_to_one_destination_keep_order() {
    init_tracing();

    let (hub_tx, signaling, _rx) = create_test_hub(Some(2));
    let c1 = signaling.connect();
    let c2 = signaling.connect();

    for i in 0..20 {
        send_signal(
            &hub_tx,
            c1,
            ClientMessage::IceCandidate {
                to: c2,
                candidate: IceCandidate::new(format!("candidate:{}", i)),
            },
        )
        .await;
    }
    sync(&hub_tx).await;

    let received: Vec<String> = signaling
        .messages_for(&c2)
        .into_iter()
        .filter_map(|m| match m {
            ServerMessage::IceCandidate { from, candidate } if from == c1 => {
                Some(candidate.candidate)
            }
            _ => None,
        })
        .collect();

    let expected: Vec<String> = (0..20).map(|i| format!("candidate:{}", i)).collect();
    assert_eq!(received, expected);
}
