//! tests/api/pipeline.rs
use std::collections::HashSet;
use std::time::Duration;

use crate::helpers::{parse_output, scratch_dir, write_input, TestReducer};
use mrwc::mapper::{Mapper, MapperConfig};
use mrwc::partition;

#[tokio::test]
async fn should_count_a_single_file_end_to_end() {
    // Arrange
    let reducer = TestReducer::start().await;
    let dir = scratch_dir();
    let input = write_input(&dir, "input.txt", "a a b");

    // Act
    let mapper = Mapper::connect(&[reducer.addr.to_string()], MapperConfig::default())
        .await
        .expect("Failed to connect mapper");
    let summary = mapper.run(vec![input]).await.expect("Mapper failed");
    let output = reducer.finish(1).await;

    // Assert
    assert_eq!(summary.words, 3);
    assert_eq!(output, "a 2\nb 1\n");
    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn should_keep_reducer_outputs_disjoint() {
    // Arrange
    let reducers = [TestReducer::start().await, TestReducer::start().await];
    let hosts: Vec<String> = reducers.iter().map(|r| r.addr.to_string()).collect();
    let dir = scratch_dir();
    let input = write_input(&dir, "pets.txt", "cat dog the cat a b the dog cat");

    // Act
    let mapper = Mapper::connect(&hosts, MapperConfig::default())
        .await
        .expect("Failed to connect mapper");
    mapper.run(vec![input]).await.expect("Mapper failed");
    let mut outputs = Vec::new();
    for reducer in reducers {
        outputs.push(parse_output(&reducer.finish(1).await));
    }

    // Assert
    let mut seen = HashSet::new();
    for (index, output) in outputs.iter().enumerate() {
        for (word, _) in output {
            assert_eq!(partition(word, 2), index, "{word} landed on reducer {index}");
            assert!(seen.insert(word.clone()), "{word} appears in two outputs");
        }
    }
    let vocabulary: HashSet<String> = ["cat", "dog", "the", "a", "b"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(seen, vocabulary);
    let cats = outputs.iter().flatten().find(|(w, _)| w == "cat").unwrap();
    assert_eq!(cats.1, 3);
    std::fs::remove_dir_all(dir).unwrap();
}

#[tokio::test]
async fn should_not_lose_words_across_files_and_endpoints() {
    // Arrange
    let reducers = [
        TestReducer::start().await,
        TestReducer::start().await,
        TestReducer::start().await,
    ];
    let hosts: Vec<String> = reducers.iter().map(|r| r.addr.to_string()).collect();
    let dir = scratch_dir();
    let mut inputs = Vec::new();
    let mut expected = 0u64;
    for file in 0..8 {
        let text = (0..500)
            .map(|i| format!("{}{}", char::from(b'a' + (i % 26) as u8), ["x", "y", "z"][file % 3]))
            .collect::<Vec<_>>()
            .join(" ");
        expected += 500;
        inputs.push(write_input(&dir, &format!("input-{file}.txt"), &text));
    }
    let config = MapperConfig {
        batch_size: 7,
        backoff: Duration::from_millis(10),
        ..Default::default()
    };

    // Act
    let mapper = Mapper::connect(&hosts, config)
        .await
        .expect("Failed to connect mapper");
    let summary = mapper.run(inputs).await.expect("Mapper failed");
    let mut total = 0;
    for reducer in reducers {
        total += parse_output(&reducer.finish(1).await)
            .into_iter()
            .map(|(_, count)| count)
            .sum::<u64>();
    }

    // Assert
    assert!(summary.failed_files.is_empty());
    assert_eq!(summary.words as u64, expected);
    assert_eq!(total, expected);
    std::fs::remove_dir_all(dir).unwrap();
}
