use std::time::Duration;

use rat_transport::{dial, Connection, Listener, Liveness};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

#[tokio::test]
async fn chunks_survive_a_real_socket() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listener = Listener::bind("127.0.0.1:0", move |conn: Connection, _flag| {
        let tx = tx.clone();
        async move {
            let (mut reader, _writer) = conn.split(8);
            while let Ok(Some(chunk)) = reader.next_chunk().await {
                let _ = tx.send(chunk);
            }
        }
    })
    .await
    .unwrap();

    let sent = dial(listener.local_addr(), Liveness::new(), |conn| async move {
        let (_reader, mut writer) = conn.split(8);
        for piece in [&b"0123"[..], &b"4567"[..], &b"89abcdef"[..]] {
            writer.write_all(piece).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        writer.shutdown().await.unwrap();
        2
    })
    .await
    .unwrap();

    let mut got = Vec::new();
    for _ in 0..sent {
        got.push(rx.recv().await.unwrap());
    }
    assert_eq!(got[0], &b"01234567"[..]);
    assert_eq!(got[1], &b"89abcdef"[..]);

    listener.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn dial_refused_is_an_error() {
    let mut listener = Listener::bind("127.0.0.1:0", |_c, _f| async {}).await.unwrap();
    let addr = listener.local_addr();
    listener.stop().await;
    drop(listener);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let res = dial(addr, Liveness::new(), |_conn| async {}).await;
    assert!(res.is_err());
}
