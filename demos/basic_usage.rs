use std::io;

use futures_util::StreamExt;
use range_tombstone::rows_with_tombstones;
use range_tombstone::schema::encode_bigint;
use range_tombstone::ClusteringKeyPrefix;
use range_tombstone::ClusteringSchema;
use range_tombstone::Fragment;
use range_tombstone::RangeTombstone;
use range_tombstone::Tombstone;

fn ck(v: i64) -> ClusteringKeyPrefix {
    ClusteringKeyPrefix::new(vec![encode_bigint(v)])
}

#[tokio::main]
async fn main() -> io::Result<()> {
    // Load the clustering columns from a JSON config
    let schema: ClusteringSchema =
        serde_json::from_str(r#"{"columns": [{"name": "seq", "column_type": "bigint"}]}"#)?;

    let fragments = vec![
        Fragment::PartitionStart(Tombstone::new(5, 1_700_000_000)),
        Fragment::Row(ck(1)),
        // Delete rows 10..=40, then rows 20..=30 again later
        Fragment::RangeTombstone(RangeTombstone::inclusive(
            ck(10),
            ck(40),
            Tombstone::new(10, 1_700_000_100),
        )),
        Fragment::RangeTombstone(RangeTombstone::inclusive(
            ck(20),
            ck(30),
            Tombstone::new(20, 1_700_000_200),
        )),
        Fragment::Row(ck(25)),
        Fragment::Row(ck(35)),
        Fragment::Row(ck(50)),
    ];

    let mut rows = rows_with_tombstones(schema, false, futures::stream::iter(fragments.into_iter().map(Ok)));

    while let Some(result) = rows.next().await {
        let (key, tomb) = result?;
        println!("Row: {}, Tombstone: {}", key, tomb);
    }

    Ok(())
}
