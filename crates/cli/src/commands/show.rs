//! rolelens show command

use access::{AccessService, IamAccessService, InMemoryAccessService};
use anyhow::Context;
use clap::Args;
use resolver::RolePolicyAggregator;
use shared::{AwsConfig, NullObserver, ResolutionObserver, ResolveOptions, RolelensConfig, Snapshot};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::observer::ConsoleObserver;

#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Role to resolve
    pub role: String,

    /// Report failed policies in the output instead of aborting
    #[arg(long)]
    pub continue_on_error: bool,

    /// Abort on the first failed policy, even if the config file says otherwise
    #[arg(long, conflicts_with = "continue_on_error")]
    pub fail_fast: bool,

    /// Maximum number of policies resolved at once
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Print the snapshot on a single line
    #[arg(long)]
    pub compact: bool,

    /// Read from an exported account fixture instead of AWS IAM
    #[arg(long, value_name = "PATH")]
    pub fixture: Option<PathBuf>,

    /// Configuration file (JSON or YAML)
    #[arg(short, long, env = "ROLELENS_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// AWS region
    #[arg(long)]
    pub region: Option<String>,

    /// AWS shared config profile
    #[arg(long)]
    pub profile: Option<String>,
}

impl ShowCommand {
    pub async fn run(&self, verbose: bool) -> anyhow::Result<()> {
        let config = self.load_config()?;
        let observer: Arc<dyn ResolutionObserver> = if verbose {
            Arc::new(ConsoleObserver)
        } else {
            Arc::new(NullObserver)
        };

        let snapshot = self.execute(&config, observer).await?;
        let output = render(&snapshot, self.compact).context("Failed to render snapshot")?;
        println!("{}", output);
        Ok(())
    }

    pub fn load_config(&self) -> anyhow::Result<RolelensConfig> {
        match &self.config {
            Some(path) => RolelensConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display())),
            None => Ok(RolelensConfig::default()),
        }
    }

    /// Config file values, overridden by flags
    pub fn resolve_options(&self, config: &RolelensConfig) -> ResolveOptions {
        let mut options = config.resolution.clone();
        if self.continue_on_error {
            options.continue_on_policy_error = true;
        }
        if self.fail_fast {
            options.continue_on_policy_error = false;
        }
        if let Some(max_concurrency) = self.max_concurrency {
            options.max_concurrency = max_concurrency;
        }
        options
    }

    pub fn aws_config(&self, config: &RolelensConfig) -> AwsConfig {
        AwsConfig {
            region: self.region.clone().or_else(|| config.aws.region.clone()),
            profile: self.profile.clone().or_else(|| config.aws.profile.clone()),
        }
    }

    async fn access_service(&self, config: &RolelensConfig) -> anyhow::Result<Arc<dyn AccessService>> {
        match &self.fixture {
            Some(path) => {
                let service = InMemoryAccessService::from_fixture_file(path)
                    .with_context(|| format!("Failed to load fixture from {}", path.display()))?;
                Ok(Arc::new(service))
            }
            None => Ok(Arc::new(IamAccessService::new(&self.aws_config(config)).await)),
        }
    }

    /// Resolve the role into a snapshot without printing it
    pub async fn execute(
        &self,
        config: &RolelensConfig,
        observer: Arc<dyn ResolutionObserver>,
    ) -> anyhow::Result<Snapshot> {
        let options = self.resolve_options(config);
        options.validate().context("Invalid resolution options")?;

        let service = self.access_service(config).await?;
        debug!(
            role = %self.role,
            backend = %service.name(),
            max_concurrency = options.max_concurrency,
            continue_on_policy_error = options.continue_on_policy_error,
            "Starting resolution"
        );

        RolePolicyAggregator::new(service, options)
            .with_observer(observer)
            .resolve(&self.role)
            .await
            .with_context(|| format!("Failed to resolve role '{}'", self.role))
    }
}

/// Snapshot as JSON, pretty unless `compact`
pub fn render(snapshot: &Snapshot, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(snapshot)
    } else {
        serde_json::to_string_pretty(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        show: ShowCommand,
    }

    fn parse(args: &[&str]) -> ShowCommand {
        let argv = std::iter::once("rolelens").chain(args.iter().copied());
        TestCli::parse_from(argv).show
    }

    const FIXTURE: &str = r#"{
        "Roles": [
            {
                "RoleName": "eksworkshop-admin",
                "Arn": "arn:aws:iam::123456789012:role/eksworkshop-admin"
            },
            {
                "RoleName": "deployer",
                "Arn": "arn:aws:iam::123456789012:role/deployer",
                "Description": "CI deployer",
                "AttachedPolicies": [
                    {"PolicyArn": "arn:aws:iam::aws:policy/ReadOnlyAccess", "PolicyName": "ReadOnlyAccess"},
                    {"PolicyArn": "arn:aws:iam::123456789012:policy/deploy", "PolicyName": "deploy"}
                ]
            }
        ],
        "Policies": [
            {
                "Arn": "arn:aws:iam::aws:policy/ReadOnlyAccess",
                "PolicyName": "ReadOnlyAccess",
                "DefaultVersionId": "v2",
                "Versions": {
                    "v2": {"Version": "2012-10-17", "Statement": [{"Effect": "Allow", "Action": ["s3:Get*", "s3:List*"], "Resource": "*"}]}
                }
            },
            {
                "Arn": "arn:aws:iam::123456789012:policy/deploy",
                "PolicyName": "deploy",
                "Description": "Deploy to EKS",
                "DefaultVersionId": "v1",
                "Versions": {
                    "v1": {"Version": "2012-10-17", "Statement": {"Effect": "Allow", "Action": "eks:*", "Resource": "*"}}
                }
            }
        ]
    }"#;

    fn fixture_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{}", FIXTURE).unwrap();
        file
    }

    // ============== Argument Parsing Tests ==============

    #[test]
    fn test_parse_defaults() {
        let cmd = parse(&["eksworkshop-admin"]);

        assert_eq!(cmd.role, "eksworkshop-admin");
        assert!(!cmd.continue_on_error);
        assert!(!cmd.compact);
        assert_eq!(cmd.max_concurrency, None);
        assert_eq!(cmd.fixture, None);
        assert_eq!(cmd.resolve_options(&RolelensConfig::default()), ResolveOptions::default());
    }

    #[test]
    fn test_parse_all_flags() {
        let cmd = parse(&[
            "deployer",
            "--continue-on-error",
            "--max-concurrency",
            "8",
            "--compact",
            "--fixture",
            "account.json",
            "--region",
            "eu-west-1",
            "--profile",
            "audit",
        ]);

        assert!(cmd.continue_on_error);
        assert!(cmd.compact);
        assert_eq!(cmd.max_concurrency, Some(8));
        assert_eq!(cmd.fixture, Some(PathBuf::from("account.json")));
        assert_eq!(cmd.region.as_deref(), Some("eu-west-1"));
        assert_eq!(cmd.profile.as_deref(), Some("audit"));
    }

    #[test]
    fn test_missing_role_is_rejected() {
        assert!(TestCli::try_parse_from(["rolelens"]).is_err());
    }

    #[test]
    fn test_non_numeric_concurrency_is_rejected() {
        assert!(TestCli::try_parse_from(["rolelens", "r", "--max-concurrency", "many"]).is_err());
    }

    // ============== Config Merge Tests ==============

    #[test]
    fn test_config_values_used_without_flags() {
        let config = RolelensConfig {
            resolution: ResolveOptions::default()
                .with_continue_on_policy_error(true)
                .with_max_concurrency(2),
            aws: AwsConfig {
                region: Some("us-east-1".to_string()),
                profile: Some("prod".to_string()),
            },
        };
        let cmd = parse(&["r"]);

        assert_eq!(cmd.resolve_options(&config), config.resolution);
        assert_eq!(cmd.aws_config(&config), config.aws);
    }

    #[test]
    fn test_flags_override_config() {
        let config = RolelensConfig {
            resolution: ResolveOptions::default().with_max_concurrency(2),
            aws: AwsConfig {
                region: Some("us-east-1".to_string()),
                profile: Some("prod".to_string()),
            },
        };
        let cmd = parse(&["r", "--max-concurrency", "1", "--continue-on-error", "--region", "ap-northeast-1"]);

        let options = cmd.resolve_options(&config);
        assert_eq!(options.max_concurrency, 1);
        assert!(options.continue_on_policy_error);

        let aws = cmd.aws_config(&config);
        assert_eq!(aws.region.as_deref(), Some("ap-northeast-1"));
        assert_eq!(aws.profile.as_deref(), Some("prod"));
    }

    #[test]
    fn test_fail_fast_overrides_config() {
        let config = RolelensConfig {
            resolution: ResolveOptions::default().with_continue_on_policy_error(true),
            ..Default::default()
        };

        assert!(parse(&["r"]).resolve_options(&config).continue_on_policy_error);
        assert!(!parse(&["r", "--fail-fast"]).resolve_options(&config).continue_on_policy_error);
    }

    #[test]
    fn test_fail_fast_conflicts_with_continue_on_error() {
        let result = TestCli::try_parse_from(["rolelens", "r", "--fail-fast", "--continue-on-error"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "resolution:\n  maxConcurrency: 6\naws:\n  region: eu-central-1").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = parse(&["r", "--config", path.as_str()]).load_config().unwrap();

        assert_eq!(config.resolution.max_concurrency, 6);
        assert_eq!(config.aws.region.as_deref(), Some("eu-central-1"));
    }

    #[test]
    fn test_load_missing_config_file() {
        let err = parse(&["r", "--config", "/nonexistent/rolelens.yaml"]).load_config().unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    // ============== Execution Tests ==============

    #[tokio::test]
    async fn test_execute_against_fixture() {
        let file = fixture_file();
        let path = file.path().to_string_lossy().to_string();
        let cmd = parse(&["deployer", "--fixture", path.as_str()]);

        let snapshot = cmd
            .execute(&RolelensConfig::default(), Arc::new(NullObserver))
            .await
            .unwrap();

        assert_eq!(snapshot.role().description.as_deref(), Some("CI deployer"));
        assert_eq!(
            snapshot.policy_arns(),
            vec!["arn:aws:iam::aws:policy/ReadOnlyAccess", "arn:aws:iam::123456789012:policy/deploy"]
        );
        assert_eq!(snapshot.policies()[1].document.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_role_without_policies() {
        let file = fixture_file();
        let path = file.path().to_string_lossy().to_string();
        let cmd = parse(&["eksworkshop-admin", "--fixture", path.as_str()]);

        let snapshot = cmd
            .execute(&RolelensConfig::default(), Arc::new(NullObserver))
            .await
            .unwrap();

        assert!(snapshot.policies().is_empty());
    }

    #[tokio::test]
    async fn test_execute_unknown_role() {
        let file = fixture_file();
        let path = file.path().to_string_lossy().to_string();
        let cmd = parse(&["ghost-role", "--fixture", path.as_str()]);

        let err = cmd
            .execute(&RolelensConfig::default(), Arc::new(NullObserver))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("ghost-role"));
        assert!(matches!(
            err.downcast_ref::<shared::ResolveError>(),
            Some(shared::ResolveError::RoleNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_rejects_zero_concurrency() {
        let file = fixture_file();
        let path = file.path().to_string_lossy().to_string();
        let cmd = parse(&["deployer", "--fixture", path.as_str(), "--max-concurrency", "0"]);

        let err = cmd
            .execute(&RolelensConfig::default(), Arc::new(NullObserver))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Invalid resolution options"));
    }

    // ============== Rendering Tests ==============

    #[tokio::test]
    async fn test_render_uses_service_field_names() {
        let file = fixture_file();
        let path = file.path().to_string_lossy().to_string();
        let snapshot = parse(&["deployer", "--fixture", path.as_str()])
            .execute(&RolelensConfig::default(), Arc::new(NullObserver))
            .await
            .unwrap();

        let pretty = render(&snapshot, false).unwrap();
        let compact = render(&snapshot, true).unwrap();

        assert!(pretty.contains('\n'));
        assert!(!compact.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&compact).unwrap();
        assert_eq!(value["RoleName"], "deployer");
        assert_eq!(value["Policies"][1]["PolicyArn"], "arn:aws:iam::123456789012:policy/deploy");
        assert_eq!(value["Policies"][1]["Document"][0]["Action"], "eks:*");
        assert!(value.get("Errors").is_none());
    }
}
