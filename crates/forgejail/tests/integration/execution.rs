use std::time::{Duration, Instant};

use forgejail::{Config, Language, ResourceLimits, Runner};

use super::materialize;

fn runner() -> Runner {
    Runner::new(Config::default())
}

#[tokio::test]
#[ignore = "requires nsjail"]
async fn test_python_hello_world() {
    let (_dir, request) = materialize(Language::Python, "print('Hello, World!')\n");
    let result = runner().execute(&request).await.unwrap();

    assert_eq!(result.stdout, "Hello, World!\n");
    assert_eq!(result.exit_code, Some(0));
    assert!(!result.timed_out);
    assert!(result.elapsed_seconds.is_some());
    assert!(result.memory_mb.is_some());
    assert_eq!(result.message, "Success");
}

#[tokio::test]
#[ignore = "requires nsjail"]
async fn test_javascript_hello_world() {
    let (_dir, request) = materialize(Language::JavaScript, "console.log('Hello, World!');\n");
    let result = runner().execute(&request).await.unwrap();

    assert_eq!(result.stdout, "Hello, World!\n");
    assert_eq!(result.message, "Success");
}

#[tokio::test]
#[ignore = "requires nsjail"]
async fn test_python_reads_input() {
    let (_dir, request) = materialize(
        Language::Python,
        "a, b = map(int, input().split())\nprint(a + b)\n",
    );
    let result = runner()
        .execute(&request.with_input("3 4\n"))
        .await
        .unwrap();

    assert_eq!(result.stdout, "7\n");
    assert_eq!(result.message, "Success");
}

#[tokio::test]
#[ignore = "requires nsjail"]
async fn test_python_runtime_error() {
    let (_dir, request) = materialize(Language::Python, "print('before')\n1 / 0\n");
    let result = runner().execute(&request).await.unwrap();

    assert_eq!(result.stdout, "before\n");
    assert_eq!(result.exit_code, Some(1));
    assert!(result.stderr.contains("ZeroDivisionError"));
    assert_eq!(result.message, "Runtime error");
}

#[tokio::test]
#[ignore = "requires nsjail"]
async fn test_python_infinite_loop_times_out() {
    let (_dir, request) = materialize(Language::Python, "while True:\n    pass\n");
    let request = request.with_limits(ResourceLimits::none().with_time_limit(1.0));

    let started = Instant::now();
    let result = runner().execute(&request).await.unwrap();

    assert!(result.timed_out);
    assert_eq!(result.message, "Time limit exceeded");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
#[ignore = "requires nsjail"]
async fn test_javascript_exit_code() {
    let (_dir, request) = materialize(Language::JavaScript, "process.exit(3);\n");
    let result = runner().execute(&request).await.unwrap();

    assert_eq!(result.exit_code, Some(3));
    assert_eq!(result.message, "Runtime error");
}
