// ABOUTME: Integration tests for task file parsing, discovery, and connection resolution.
// ABOUTME: Tests YAML parsing, env var interpolation, and per-task connection overrides.

use dockhand::config::*;
use dockhand::engine::DockerConfigSource;
use dockhand::error::Error;
use dockhand::tasks::Task;
use std::fs;
use std::path::Path;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_task_file() {
        let yaml = r#"
tasks:
  - type: build
    dockerfile: Dockerfile
    tags: app:1
"#;
        let file = TaskFile::from_yaml(yaml).unwrap();
        assert_eq!(file.tasks.len(), 1);
        assert_eq!(file.tasks.head.label(), "build");
        assert_eq!(file.connection, ConnectionConfig::default());
    }

    #[test]
    fn parse_every_task_kind() {
        let yaml = r#"
tasks:
  - name: image
    type: build
    dockerfile: |
      FROM alpine
    tags: [registry.example.com/app:1.0]
    platforms: linux/amd64
    build_args: { VERSION: "1.0" }
    push: true
  - type: push
    tags: [registry.example.com/app:1.0]
  - type: pull
    image: alpine:3.20
  - type: tag
    source_image: alpine:3.20
    target_image: mirror.local/alpine:3.20
  - type: image
    command: remove
    source_image: mirror.local/alpine:3.20
  - type: rm
    container_ids: [web]
  - type: prune
    prune_type: IMAGES
    dangling: true
  - type: stop
    container_id: web
    kill: true
  - type: compose
    compose_files: [base.yaml, prod.yaml]
    project_name: shop
    args: [up, -d]
"#;
        let file = TaskFile::from_yaml(yaml).unwrap();
        let kinds: Vec<_> = file.tasks.iter().map(|t| t.task.kind()).collect();
        assert_eq!(
            kinds,
            vec!["build", "push", "pull", "tag", "image", "rm", "prune", "stop", "compose"]
        );
        assert_eq!(file.tasks.head.label(), "image");

        match &file.tasks.head.task {
            Task::Build(build) => {
                assert_eq!(build.platforms, vec!["linux/amd64"]);
                assert!(build.push);
                assert!(build.pull);
            }
            other => panic!("expected build, got {other:?}"),
        }
    }

    #[test]
    fn unknown_task_type_is_rejected() {
        let yaml = r#"
tasks:
  - type: deploy
    image: app:1
"#;
        let err = TaskFile::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
        assert!(err.to_string().contains("deploy"), "got: {err}");
    }

    #[test]
    fn empty_task_list_is_rejected() {
        let err = TaskFile::from_yaml("tasks: []\n").unwrap_err();
        assert!(err.to_string().contains("at least one task"), "got: {err}");
    }
}

mod connection {
    use super::*;

    #[test]
    fn task_override_wins_over_file_level() {
        let yaml = r#"
connection:
  host: unix:///var/run/docker.sock
  credentials:
    registry: registry.example.com
    username: ci
tasks:
  - type: pull
    image: alpine
  - type: push
    tags: app:1
    connection:
      host: tcp://other:2375
"#;
        let file = TaskFile::from_yaml(yaml).unwrap();
        let first = file.connection_for(&file.tasks.head).resolve().unwrap();
        let second = file.connection_for(&file.tasks.tail[0]).resolve().unwrap();

        assert_eq!(first.host.as_deref(), Some("unix:///var/run/docker.sock"));
        assert_eq!(second.host.as_deref(), Some("tcp://other:2375"));
        assert_eq!(second.normalized_host().as_deref(), Some("http://other:2375"));
        assert_eq!(
            second.credential.unwrap().registry.as_deref(),
            Some("registry.example.com")
        );
    }

    #[test]
    fn env_references_resolve_at_task_start() {
        temp_env::with_vars(
            [
                ("DOCKHAND_TEST_USER", Some("robot")),
                ("DOCKHAND_TEST_PASSWORD", None::<&str>),
            ],
            || {
                let yaml = r#"
credentials:
  username: { env: DOCKHAND_TEST_USER }
  password: { env: DOCKHAND_TEST_PASSWORD, default: fallback }
"#;
                let conn: ConnectionConfig = serde_yaml::from_str(yaml).unwrap();
                let credential = conn.resolve().unwrap().credential.unwrap();
                assert_eq!(credential.username.as_deref(), Some("robot"));
                assert_eq!(credential.password.as_deref(), Some("fallback"));
            },
        );
    }

    #[test]
    fn missing_env_var_without_default_fails() {
        temp_env::with_var_unset("DOCKHAND_TEST_HOST", || {
            let conn: ConnectionConfig =
                serde_yaml::from_str("host: { env: DOCKHAND_TEST_HOST }\n").unwrap();
            let err = conn.resolve().unwrap_err();
            assert!(matches!(err, Error::MissingEnvVar(var) if var == "DOCKHAND_TEST_HOST"));
        });
    }

    #[test]
    fn inline_json_config_string_is_parsed() {
        let conn: ConnectionConfig = serde_yaml::from_str(
            r#"config: '{"auths": {"ghcr.io": {"auth": "dXNlcjpwYXNz"}}}'"#,
        )
        .unwrap();
        let settings = conn.resolve().unwrap();
        assert!(matches!(settings.config, Some(DockerConfigSource::Inline(_))));
    }
}

mod discovery {
    use super::*;

    #[test]
    fn finds_files_in_precedence_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".dockhand")).unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME_DIR), "tasks: []").unwrap();
        assert_eq!(
            TaskFile::discover(dir.path()).unwrap(),
            dir.path().join(CONFIG_FILENAME_DIR)
        );

        fs::write(dir.path().join(CONFIG_FILENAME_ALT), "tasks: []").unwrap();
        assert_eq!(
            TaskFile::discover(dir.path()).unwrap(),
            dir.path().join(CONFIG_FILENAME_ALT)
        );

        fs::write(dir.path().join(CONFIG_FILENAME), "tasks: []").unwrap();
        assert_eq!(
            TaskFile::discover(dir.path()).unwrap(),
            dir.path().join(CONFIG_FILENAME)
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            TaskFile::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }

    #[test]
    fn relative_dirs_resolve_against_the_base() {
        let file = TaskFile::from_yaml(
            "working_dir: app\nstorage_root: blobs\ntasks:\n  - type: pull\n    image: alpine\n",
        )
        .unwrap();
        let working_dir = file.working_dir(Path::new("/srv/ci"));
        assert_eq!(working_dir, Path::new("/srv/ci/app"));
        assert_eq!(file.storage_root(&working_dir), Path::new("/srv/ci/app/blobs"));

        let file = TaskFile::from_yaml("tasks:\n  - type: pull\n    image: alpine\n").unwrap();
        assert_eq!(
            file.storage_root(Path::new("/srv/ci")),
            Path::new("/srv/ci").join(DEFAULT_STORAGE_DIR)
        );
    }
}

mod init {
    use super::*;

    #[test]
    fn template_parses_as_a_task_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = init_config(dir.path(), Some("ghcr.io/org/app:1"), false).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("ghcr.io/org/app:1"));

        let file = TaskFile::from_yaml(&content).unwrap();
        assert_eq!(file.tasks.head.task.kind(), "build");
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), None, false).unwrap();
        assert!(matches!(
            init_config(dir.path(), None, false),
            Err(Error::AlreadyExists(_))
        ));
        assert!(init_config(dir.path(), None, true).is_ok());
    }
}
