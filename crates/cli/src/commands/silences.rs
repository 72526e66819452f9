use chrono::{Duration, Utc};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::client::{CreateSilenceRequest, MatcherView, RelayMuxClient, SilenceView};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct SilencesArgs {
    #[command(subcommand)]
    pub command: SilencesCommand,
}

#[derive(Subcommand, Debug)]
pub enum SilencesCommand {
    /// List every stored silence.
    List,
    /// Fetch one silence by id.
    Get {
        id: Uuid,
    },
    /// Create a new silence.
    ///
    /// Each matcher is `name=value` (equals), `name!=value` (not
    /// equals), `name=~value` (regex match), or `name!~value` (regex
    /// non-match).
    Create {
        #[arg(required = true)]
        matchers: Vec<String>,

        /// How long the silence lasts from now, e.g. "1h30m".
        #[arg(long, default_value = "1h")]
        duration: String,

        #[arg(long, default_value = "relaymux-cli")]
        author: String,

        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Expire a silence immediately.
    Expire {
        id: Uuid,
    },
}

pub async fn run(client: &RelayMuxClient, args: &SilencesArgs, format: &OutputFormat) -> anyhow::Result<()> {
    match &args.command {
        SilencesCommand::List => {
            let silences = client.list_silences().await?;
            print_silences(&silences, format)?;
        }
        SilencesCommand::Get { id } => {
            let silence = client.get_silence(*id).await?;
            print_silences(std::slice::from_ref(&silence), format)?;
        }
        SilencesCommand::Create { matchers, duration, author, comment } => {
            let matchers = matchers.iter().map(|m| parse_matcher(m)).collect::<anyhow::Result<Vec<_>>>()?;
            let ends_at = Utc::now() + parse_duration(duration)?;
            let req = CreateSilenceRequest {
                matchers,
                starts_at: Utc::now(),
                ends_at,
                created_by: author.clone(),
                comment: comment.clone(),
            };
            let silence = client.create_silence(&req).await?;
            print_silences(std::slice::from_ref(&silence), format)?;
        }
        SilencesCommand::Expire { id } => {
            let silence = client.expire_silence(*id).await?;
            print_silences(std::slice::from_ref(&silence), format)?;
        }
    }
    Ok(())
}

fn print_silences(silences: &[SilenceView], format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(silences)?),
        OutputFormat::Text => {
            for silence in silences {
                let matchers: Vec<String> = silence.matchers.iter().map(render_matcher).collect();
                println!(
                    "{id}  [{status}]  {matchers}  ends {ends}  by {author}",
                    id = silence.id,
                    status = silence.status,
                    matchers = matchers.join(", "),
                    ends = silence.ends_at,
                    author = silence.created_by,
                );
            }
        }
    }
    Ok(())
}

fn render_matcher(m: &MatcherView) -> String {
    let op = match (m.is_equal, m.is_regex) {
        (true, false) => "=",
        (false, false) => "!=",
        (true, true) => "=~",
        (false, true) => "!~",
    };
    format!("{}{op}{}", m.name, m.value)
}

/// Parse one `name<op>value` matcher, trying the two-character operators
/// before the one-character ones so `!=`/`=~` aren't misread as `=`.
fn parse_matcher(raw: &str) -> anyhow::Result<MatcherView> {
    for (op, is_equal, is_regex) in [("!~", false, true), ("=~", true, true), ("!=", false, false)] {
        if let Some((name, value)) = raw.split_once(op) {
            return Ok(MatcherView { name: name.to_string(), value: value.to_string(), is_regex, is_equal });
        }
    }
    if let Some((name, value)) = raw.split_once('=') {
        return Ok(MatcherView { name: name.to_string(), value: value.to_string(), is_regex: false, is_equal: true });
    }
    anyhow::bail!("invalid matcher {raw:?}, expected name=value, name!=value, name=~value, or name!~value")
}

fn parse_duration(raw: &str) -> anyhow::Result<Duration> {
    let mut total = Duration::zero();
    let mut number = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_digit() {
            number.push(ch);
            continue;
        }
        let amount: i64 = number.parse().map_err(|_| anyhow::anyhow!("invalid duration {raw:?}"))?;
        number.clear();
        total = total
            + match ch {
                'h' => Duration::hours(amount),
                'm' => Duration::minutes(amount),
                's' => Duration::seconds(amount),
                'd' => Duration::days(amount),
                other => anyhow::bail!("unknown duration unit {other:?} in {raw:?}"),
            };
    }
    if !number.is_empty() {
        anyhow::bail!("trailing number with no unit in duration {raw:?}");
    }
    if total <= Duration::zero() {
        anyhow::bail!("duration {raw:?} must be positive");
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_equal_and_negated_and_regex_matchers() {
        let m = parse_matcher("alertname=HighLoad").unwrap();
        assert!(m.is_equal && !m.is_regex);

        let m = parse_matcher("alertname!=HighLoad").unwrap();
        assert!(!m.is_equal && !m.is_regex);

        let m = parse_matcher("severity=~critical|warning").unwrap();
        assert!(m.is_equal && m.is_regex);

        let m = parse_matcher("severity!~critical|warning").unwrap();
        assert!(!m.is_equal && m.is_regex);
    }

    #[test]
    fn parses_compound_durations() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::hours(1) + Duration::minutes(30));
        assert_eq!(parse_duration("45s").unwrap(), Duration::seconds(45));
        assert!(parse_duration("bogus").is_err());
    }
}
