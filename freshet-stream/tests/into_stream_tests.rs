// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use freshet_core::FreshetError;
use freshet_stream::prelude::*;
use futures::StreamExt;

#[tokio::test]
async fn test_values_arrive_in_order() -> anyhow::Result<()> {
    // Arrange
    let stream = range(1, 5).map(|x| x * 2).into_stream();

    // Act
    let values: Vec<i64> = stream
        .map(|item| item.expect("unexpected stream error"))
        .collect()
        .await;

    // Assert
    assert_eq!(values, vec![2, 4, 6, 8, 10]);
    Ok(())
}

#[tokio::test]
async fn test_error_ends_the_stream() -> anyhow::Result<()> {
    // Arrange
    let source = concat_array(vec![
        range(1, 2).into_dyn(),
        fail::<i64>(FreshetError::stream("bridge failure")).into_dyn(),
    ]);

    // Act
    let items: Vec<std::result::Result<i64, FreshetError>> = source.into_stream().collect().await;

    // Assert
    assert_eq!(items.len(), 3);
    assert!(items[0].is_ok());
    assert!(items[1].is_ok());
    assert!(items[2].is_err());
    Ok(())
}

#[tokio::test]
async fn test_empty_source_yields_no_items() -> anyhow::Result<()> {
    let items: Vec<std::result::Result<i64, FreshetError>> =
        empty::<i64>().into_stream().collect().await;
    assert!(items.is_empty());
    Ok(())
}
