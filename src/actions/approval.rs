use super::LiveIndex;
use crate::ledger::{validate_channel_name, ChannelAction, ChannelRecord};
use std::io::{self, BufRead, Write};

const DIVIDER: &str =
    "--------------------------------------------------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDecision {
    ApproveAll,
    SkipAll,
    Individually,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemDecision {
    Approve,
    Skip,
    Quit,
}

/// Blocking approval state machine over injected reader/writer so tests can
/// drive it with in-memory buffers. States: prompt, validate, re-prompt for a
/// new target, accept, quit. End-of-input counts as quit.
pub struct ApprovalSession<R, W> {
    input: R,
    output: W,
    approve_all: bool,
}

impl<R: BufRead, W: Write> ApprovalSession<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            approve_all: false,
        }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn approve_all(&self) -> bool {
        self.approve_all
    }

    fn read_reply(&mut self) -> io::Result<Option<String>> {
        self.output.flush()?;
        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Batch overview: approve everything, skip everything, fall back to
    /// one-by-one review, or quit the run.
    pub fn review_batch(&mut self, records: &[ChannelRecord]) -> io::Result<BatchDecision> {
        if self.approve_all {
            return Ok(BatchDecision::ApproveAll);
        }
        writeln!(self.output, "{DIVIDER}")?;
        writeln!(self.output, "batch of {} pending actions:", records.len())?;
        for record in records {
            writeln!(
                self.output,
                "  {} -> {}",
                display_name(record),
                describe_action(record)
            )?;
        }
        loop {
            write!(
                self.output,
                "approve all [a], skip all [s], review individually [i], quit [q]: "
            )?;
            let reply = match self.read_reply()? {
                Some(reply) => reply.to_ascii_lowercase(),
                None => return Ok(BatchDecision::Quit),
            };
            match reply.as_str() {
                "a" => return Ok(BatchDecision::ApproveAll),
                "s" => return Ok(BatchDecision::SkipAll),
                "i" => return Ok(BatchDecision::Individually),
                "q" => return Ok(BatchDecision::Quit),
                _ => {}
            }
        }
    }

    /// One pending action with full context. An invalid or unavailable target
    /// enters an inline retarget loop instead of forcing a restart; the
    /// replacement is validated against the same rules before re-prompting.
    pub fn review_record(
        &mut self,
        record: &mut ChannelRecord,
        live: &LiveIndex,
    ) -> io::Result<ItemDecision> {
        if self.approve_all {
            return Ok(ItemDecision::Approve);
        }

        self.print_context(record)?;

        loop {
            match validate_target(record, live) {
                Ok(()) => break,
                Err(reason) => {
                    writeln!(self.output, "invalid target: {reason}")?;
                    write!(
                        self.output,
                        "enter a new target value, `n` to skip, or `q` to quit: "
                    )?;
                    let reply = match self.read_reply()? {
                        Some(reply) => reply,
                        None => return Ok(ItemDecision::Quit),
                    };
                    match reply.as_str() {
                        "" => {}
                        "n" | "N" => return Ok(ItemDecision::Skip),
                        "q" | "Q" => return Ok(ItemDecision::Quit),
                        other => record.target_value = other.to_string(),
                    }
                }
            }
        }

        self.print_target_context(record, live)?;
        if record.action == ChannelAction::Archive {
            writeln!(
                self.output,
                "warning: archiving cannot be undone from here; members must be re-added manually if restored"
            )?;
        }

        loop {
            write!(
                self.output,
                "approve [y], skip [n], approve the rest [a], quit [q]: "
            )?;
            let reply = match self.read_reply()? {
                Some(reply) => reply.to_ascii_lowercase(),
                None => return Ok(ItemDecision::Quit),
            };
            match reply.as_str() {
                "y" => return Ok(ItemDecision::Approve),
                "n" => return Ok(ItemDecision::Skip),
                "a" => {
                    self.approve_all = true;
                    return Ok(ItemDecision::Approve);
                }
                "q" => return Ok(ItemDecision::Quit),
                _ => {}
            }
        }
    }

    fn print_context(&mut self, record: &ChannelRecord) -> io::Result<()> {
        writeln!(self.output, "{DIVIDER}")?;
        writeln!(self.output, "channel: {}", display_name(record))?;
        writeln!(
            self.output,
            "members: {}  created: {}  last activity: {}",
            record.member_count,
            or_unknown(&record.created_date),
            or_unknown(&record.last_activity)
        )?;
        if !record.description.is_empty() {
            writeln!(self.output, "description: {}", record.description)?;
        }
        if !record.notes.is_empty() {
            writeln!(self.output, "notes: {}", record.notes)?;
        }
        writeln!(self.output, "proposed action: {}", describe_action(record))
    }

    fn print_target_context(&mut self, record: &ChannelRecord, live: &LiveIndex) -> io::Result<()> {
        if record.action != ChannelAction::Archive {
            return Ok(());
        }
        let target = record.target_value.trim().trim_start_matches('#');
        if target.is_empty() {
            return Ok(());
        }
        if let Some(channel) = live.find_by_name(target) {
            writeln!(
                self.output,
                "redirect target #{}: {} members",
                channel.name, channel.num_members
            )?;
            if !channel.purpose.value.is_empty() {
                writeln!(self.output, "redirect purpose: {}", channel.purpose.value)?;
            }
            if channel.num_members < record.member_count {
                writeln!(
                    self.output,
                    "warning: redirect target has fewer members than the channel being archived"
                )?;
            }
        }
        Ok(())
    }
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "unknown"
    } else {
        value
    }
}

pub fn display_name(record: &ChannelRecord) -> String {
    if record.is_private {
        format!("#{} (private)", record.name)
    } else {
        format!("#{}", record.name)
    }
}

pub fn describe_action(record: &ChannelRecord) -> String {
    let target = record.target_value.trim();
    match record.action {
        ChannelAction::Keep => "keep as is".to_string(),
        ChannelAction::New => "newly discovered; keep as is".to_string(),
        ChannelAction::Archive => {
            if target.is_empty() {
                "archive".to_string()
            } else {
                format!("archive (redirect notice to #{})", target.trim_start_matches('#'))
            }
        }
        ChannelAction::Rename => format!("rename to `{target}`"),
        ChannelAction::UpdateDescription => format!("update description to `{target}`"),
    }
}

/// Live-set availability checks deferred to approval time so the operator can
/// retarget inline: rename collisions, missing or archived redirect targets.
pub fn validate_target(record: &ChannelRecord, live: &LiveIndex) -> Result<(), String> {
    let target = record.target_value.trim();
    match record.action {
        ChannelAction::Rename => {
            validate_channel_name(target).map_err(|err| err.to_string())?;
            if live.name_in_use(target, &record.channel_id) {
                return Err(format!("channel name `{target}` is already taken"));
            }
            Ok(())
        }
        ChannelAction::Archive => {
            if target.is_empty() {
                return Ok(());
            }
            let redirect = target.trim_start_matches('#');
            validate_channel_name(redirect).map_err(|err| err.to_string())?;
            match live.find_by_name(redirect) {
                None => Err(format!("redirect target #{redirect} not found")),
                Some(channel) if channel.is_archived => {
                    Err(format!("redirect target #{redirect} is archived"))
                }
                Some(_) => Ok(()),
            }
        }
        ChannelAction::Keep | ChannelAction::New | ChannelAction::UpdateDescription => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        describe_action, validate_target, ApprovalSession, BatchDecision, ItemDecision,
    };
    use crate::actions::LiveIndex;
    use crate::ledger::{ChannelAction, ChannelRecord};
    use crate::slack::Channel;
    use std::io::Cursor;

    fn record(name: &str, action: ChannelAction, target: &str) -> ChannelRecord {
        ChannelRecord {
            channel_id: format!("C-{name}"),
            name: name.to_string(),
            description: String::new(),
            is_private: false,
            is_shared: false,
            member_count: 10,
            created_date: "2024-01-01".to_string(),
            last_activity: String::new(),
            action,
            target_value: target.to_string(),
            notes: String::new(),
        }
    }

    fn live(names: &[(&str, &str)]) -> LiveIndex {
        LiveIndex::new(
            names
                .iter()
                .map(|(id, name)| Channel {
                    id: id.to_string(),
                    name: name.to_string(),
                    num_members: 3,
                    ..Channel::default()
                })
                .collect(),
        )
    }

    fn session(input: &str) -> ApprovalSession<Cursor<Vec<u8>>, Vec<u8>> {
        ApprovalSession::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn output_text(session: &ApprovalSession<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8_lossy(&session.output).to_string()
    }

    #[test]
    fn approve_skip_and_quit_map_to_decisions() {
        let index = live(&[("C1", "general")]);
        for (input, expected) in [
            ("y\n", ItemDecision::Approve),
            ("n\n", ItemDecision::Skip),
            ("q\n", ItemDecision::Quit),
        ] {
            let mut session = session(input);
            let mut rec = record("stale", ChannelAction::Archive, "");
            let decision = session.review_record(&mut rec, &index).expect("decision");
            assert_eq!(decision, expected, "input {input:?}");
        }
    }

    #[test]
    fn unrecognized_replies_reprompt_until_recognized() {
        let index = live(&[("C1", "general")]);
        let mut session = session("maybe\nx\ny\n");
        let mut rec = record("stale", ChannelAction::Archive, "");
        let decision = session.review_record(&mut rec, &index).expect("decision");
        assert_eq!(decision, ItemDecision::Approve);
    }

    #[test]
    fn end_of_input_counts_as_quit() {
        let index = live(&[("C1", "general")]);
        let mut session = session("");
        let mut rec = record("stale", ChannelAction::Archive, "");
        let decision = session.review_record(&mut rec, &index).expect("decision");
        assert_eq!(decision, ItemDecision::Quit);
    }

    #[test]
    fn approve_the_rest_short_circuits_later_prompts() {
        let index = live(&[("C1", "general")]);
        let mut session = session("a\n");
        let mut first = record("one", ChannelAction::Archive, "");
        assert_eq!(
            session.review_record(&mut first, &index).expect("first"),
            ItemDecision::Approve
        );
        assert!(session.approve_all());
        // No input left; would be Quit if it prompted.
        let mut second = record("two", ChannelAction::Archive, "");
        assert_eq!(
            session.review_record(&mut second, &index).expect("second"),
            ItemDecision::Approve
        );
    }

    #[test]
    fn invalid_rename_target_enters_retarget_loop_and_accepts_a_valid_one() {
        let index = live(&[("C1", "general"), ("C2", "taken")]);
        let mut rec = record("old", ChannelAction::Rename, "taken");
        let mut session = session("Still Bad\nfresh-name\ny\n");
        let decision = session.review_record(&mut rec, &index).expect("decision");
        assert_eq!(decision, ItemDecision::Approve);
        assert_eq!(rec.target_value, "fresh-name");
        let output = output_text(&session);
        assert!(output.contains("already taken"), "{output}");
        assert!(output.contains("uppercase"), "{output}");
    }

    #[test]
    fn retarget_loop_allows_skipping_out() {
        let index = live(&[("C1", "general")]);
        let mut rec = record("old", ChannelAction::Archive, "#missing");
        let mut session = session("n\n");
        let decision = session.review_record(&mut rec, &index).expect("decision");
        assert_eq!(decision, ItemDecision::Skip);
        assert!(output_text(&session).contains("#missing not found"));
    }

    #[test]
    fn batch_review_maps_replies_to_decisions() {
        let records = vec![
            record("a", ChannelAction::Rename, "b"),
            record("c", ChannelAction::Archive, ""),
        ];
        for (input, expected) in [
            ("a\n", BatchDecision::ApproveAll),
            ("s\n", BatchDecision::SkipAll),
            ("i\n", BatchDecision::Individually),
            ("q\n", BatchDecision::Quit),
            ("", BatchDecision::Quit),
        ] {
            let mut session = session(input);
            let decision = session.review_batch(&records).expect("decision");
            assert_eq!(decision, expected, "input {input:?}");
        }
    }

    #[test]
    fn archive_with_redirect_describes_the_target() {
        let rec = record("old", ChannelAction::Archive, "#new-home");
        assert_eq!(describe_action(&rec), "archive (redirect notice to #new-home)");
    }

    #[test]
    fn validate_target_flags_archived_redirects() {
        let mut channel = Channel {
            id: "C9".to_string(),
            name: "graveyard".to_string(),
            ..Channel::default()
        };
        channel.is_archived = true;
        let index = LiveIndex::new(vec![channel]);
        let rec = record("old", ChannelAction::Archive, "graveyard");
        let err = validate_target(&rec, &index).expect_err("archived target");
        assert!(err.contains("archived"), "{err}");
    }
}
