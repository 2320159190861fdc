//! Builds the report as a flat list of layout blocks. Nothing here knows about PDF.

use crate::{
    record::{Details, Record, RecordKind},
    utils::{
        text::truncate_text,
        time::{format_local, CLOCK_FORMAT, DATE_FORMAT, MINUTE_FORMAT, SECOND_FORMAT},
    },
};

use super::{
    ReportInput, APP_NAME_WIDTH, FILE_ROW_LIMIT, INSTALLED_ROW_LIMIT, LOGIN_ROW_LIMIT, PATH_WIDTH,
    PROCESS_NAME_WIDTH, PROCESS_ROW_LIMIT,
};

const INCH: f32 = 72.;

const DISCLAIMER: &str = "This report contains digital activity data collected from the user's system. \
    Use this information responsibly and in compliance with applicable privacy laws and company policies.";

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Heading(String),
    Subheading(String),
    Paragraph(String),
    /// Bold label followed by a regular value on the same line.
    Field { label: String, value: String },
    Spacer(f32),
    Table(Table),
    PageBreak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub header: &'static str,
    /// Preferred width in points, scaled down when the table is wider than the page.
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn new(columns: &[(&'static str, f32)]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|&(header, inches)| Column {
                    header,
                    width: inches * INCH,
                })
                .collect(),
            rows: vec![],
        }
    }
}

pub fn build_story(input: &ReportInput<'_>) -> Vec<Block> {
    let mut story = title_page(input);
    story.push(Block::PageBreak);
    story.extend(executive_summary(input));
    story.push(Block::PageBreak);
    story.extend(login_section(input.logins));
    story.push(Block::PageBreak);
    story.extend(file_section(input.file_shares));
    story.push(Block::PageBreak);
    story.extend(app_section(input.app_usage));
    story
}

fn title_page(input: &ReportInput<'_>) -> Vec<Block> {
    vec![
        Block::Title(input.title.to_string()),
        Block::Spacer(2. * INCH),
        Block::Field {
            label: "Employee:".into(),
            value: input.user.name.clone(),
        },
        Block::Field {
            label: "Report Generated:".into(),
            value: format_local(Some(input.generated_at), SECOND_FORMAT),
        },
        Block::Spacer(3. * INCH),
        Block::Paragraph(DISCLAIMER.into()),
    ]
}

fn executive_summary(input: &ReportInput<'_>) -> Vec<Block> {
    let mut sources = input
        .logins
        .iter()
        .map(|r| r.source.as_ref())
        .collect::<Vec<_>>();
    sources.sort_unstable();
    sources.dedup();

    let period = input
        .date_range
        .map(|range| {
            format!(
                "{} to {}",
                format_local(Some(range.start()), DATE_FORMAT),
                format_local(Some(range.end()), DATE_FORMAT)
            )
        })
        .unwrap_or_else(|| "N/A".into());

    let mut table = Table::new(&[("Metric", 2.), ("Count", 1.), ("Details", 3.)]);
    table.rows = vec![
        vec![
            "Login Events".into(),
            input.logins.len().to_string(),
            format!("From {} sources", sources.len()),
        ],
        vec![
            "File Shares".into(),
            input.file_shares.len().to_string(),
            "Recent files and network drives".into(),
        ],
        vec![
            "Applications".into(),
            input.app_usage.len().to_string(),
            "Running processes and installed apps".into(),
        ],
        vec![
            "Report Period".into(),
            period,
            format!(
                "Generated on {}",
                format_local(Some(input.generated_at), DATE_FORMAT)
            ),
        ],
    ];

    vec![
        Block::Heading("Executive Summary".into()),
        Block::Table(table),
        Block::Spacer(0.5 * INCH),
    ]
}

fn login_section(logins: &[Record]) -> Vec<Block> {
    let mut blocks = vec![Block::Heading("Login Events".into())];
    if logins.is_empty() {
        blocks.push(Block::Paragraph("No login events found.".into()));
        return blocks;
    }

    let mut table = Table::new(&[
        ("Timestamp", 1.5),
        ("Username", 1.5),
        ("Host", 1.5),
        ("Type", 1.),
        ("Source", 1.),
    ]);
    for record in logins.iter().take(LOGIN_ROW_LIMIT) {
        let Details::Login(login) = &record.details else {
            continue;
        };
        table.rows.push(vec![
            format_local(record.timestamp, MINUTE_FORMAT),
            login.username.to_string(),
            login.host.to_string(),
            record.kind.to_string(),
            record.source.to_string(),
        ]);
    }
    blocks.push(Block::Table(table));
    blocks.extend(overflow_note(logins.len(), LOGIN_ROW_LIMIT, "login events"));
    blocks
}

fn file_section(file_shares: &[Record]) -> Vec<Block> {
    let mut blocks = vec![Block::Heading("File Shares & Recent Files".into())];
    if file_shares.is_empty() {
        blocks.push(Block::Paragraph(
            "No file shares or recent files found.".into(),
        ));
        return blocks;
    }

    let mut table = Table::new(&[
        ("Path", 3.),
        ("Type", 1.5),
        ("Source", 1.5),
        ("Last Accessed", 1.5),
    ]);
    for record in file_shares.iter().take(FILE_ROW_LIMIT) {
        let Details::File(file) = &record.details else {
            continue;
        };
        table.rows.push(vec![
            truncate_text(&file.path, PATH_WIDTH),
            record.kind.to_string(),
            record.source.to_string(),
            format_local(record.timestamp, MINUTE_FORMAT),
        ]);
    }
    blocks.push(Block::Table(table));
    blocks.extend(overflow_note(file_shares.len(), FILE_ROW_LIMIT, "file shares"));
    blocks
}

fn app_section(app_usage: &[Record]) -> Vec<Block> {
    let mut blocks = vec![Block::Heading("Application Usage".into())];
    if app_usage.is_empty() {
        blocks.push(Block::Paragraph("No application usage data found.".into()));
        return blocks;
    }

    let processes = app_usage
        .iter()
        .filter(|r| r.kind == RecordKind::RunningProcess)
        .collect::<Vec<_>>();
    let installed = app_usage
        .iter()
        .filter(|r| r.kind == RecordKind::InstalledApp)
        .collect::<Vec<_>>();

    if !processes.is_empty() {
        let mut table = Table::new(&[
            ("Name", 2.),
            ("PID", 0.8),
            ("CPU %", 0.8),
            ("Memory %", 0.8),
            ("Start Time", 1.2),
        ]);
        for record in processes.iter().take(PROCESS_ROW_LIMIT) {
            let Details::Process(process) = &record.details else {
                continue;
            };
            table.rows.push(vec![
                truncate_text(&process.name, PROCESS_NAME_WIDTH),
                process.pid.to_string(),
                format!("{:.1}", process.cpu_percent),
                format!("{:.1}", process.memory_percent),
                format_local(record.timestamp, CLOCK_FORMAT),
            ]);
        }
        blocks.push(Block::Subheading("Currently Running Processes".into()));
        blocks.push(Block::Table(table));
        blocks.extend(overflow_note(processes.len(), PROCESS_ROW_LIMIT, "running processes"));
        blocks.push(Block::Spacer(0.3 * INCH));
    }

    if !installed.is_empty() {
        let mut table = Table::new(&[("Name", 4.), ("Install Date", 2.)]);
        for record in installed.iter().take(INSTALLED_ROW_LIMIT) {
            let Details::InstalledApp(app) = &record.details else {
                continue;
            };
            table.rows.push(vec![
                truncate_text(&app.name, APP_NAME_WIDTH),
                app.install_date.as_deref().unwrap_or("N/A").to_string(),
            ]);
        }
        blocks.push(Block::Subheading("Installed Applications".into()));
        blocks.push(Block::Table(table));
        blocks.extend(overflow_note(installed.len(), INSTALLED_ROW_LIMIT, "installed applications"));
    }

    blocks
}

fn overflow_note(total: usize, limit: usize, noun: &str) -> Option<Block> {
    (total > limit).then(|| {
        Block::Paragraph(format!(
            "Showing {limit} of {total} {noun} ({} more not shown).",
            total - limit
        ))
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::{
        filter::DateRange,
        record::{InstalledAppDetails, ProcessDetails},
        report::UserInfo,
    };

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap()
    }

    fn logins(count: i64) -> Vec<Record> {
        (0..count)
            .map(|i| Record::session(format!("user{i}"), "localhost", now() - Duration::hours(i), "utmpx"))
            .collect()
    }

    fn input<'a>(
        user: &'a UserInfo,
        logins: &'a [Record],
        file_shares: &'a [Record],
        app_usage: &'a [Record],
    ) -> ReportInput<'a> {
        ReportInput {
            title: "Quarterly Footprint",
            logins,
            file_shares,
            app_usage,
            user,
            date_range: None,
            generated_at: now(),
        }
    }

    fn tables(story: &[Block]) -> Vec<&Table> {
        story
            .iter()
            .filter_map(|b| match b {
                Block::Table(table) => Some(table),
                _ => None,
            })
            .collect()
    }

    fn paragraphs(story: &[Block]) -> Vec<&str> {
        story
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_login_table_is_limited() {
        let user = UserInfo { name: "alice".into() };
        let logins = logins(25);
        let story = build_story(&input(&user, &logins, &[], &[]));

        let tables = tables(&story);
        // Summary and logins.
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].rows.len(), 20);
        assert_eq!(tables[1].columns[0].header, "Timestamp");
        assert!(paragraphs(&story)
            .contains(&"Showing 20 of 25 login events (5 more not shown)."));
    }

    #[test]
    fn test_empty_categories_render_placeholders() {
        let user = UserInfo { name: "alice".into() };
        let story = build_story(&input(&user, &[], &[], &[]));

        assert_eq!(tables(&story).len(), 1);
        let paragraphs = paragraphs(&story);
        assert!(paragraphs.contains(&"No login events found."));
        assert!(paragraphs.contains(&"No file shares or recent files found."));
        assert!(paragraphs.contains(&"No application usage data found."));
        assert_eq!(
            story.iter().filter(|b| **b == Block::PageBreak).count(),
            4
        );
    }

    #[test]
    fn test_summary_counts_and_sources() {
        let user = UserInfo { name: "alice".into() };
        let mut logins = logins(2);
        logins.push(Record::current("alice", "localhost", now(), "environment"));
        let files = vec![Record::file(RecordKind::RecentFile, "/tmp/a", now(), "recently_used")];
        let mut input = input(&user, &logins, &files, &[]);
        let range = DateRange::new(now() - Duration::days(2), now()).unwrap();
        input.date_range = Some(range);

        let story = build_story(&input);

        let summary = tables(&story)[0];
        assert_eq!(summary.rows[0][1], "3");
        assert_eq!(summary.rows[0][2], "From 2 sources");
        assert_eq!(summary.rows[1][1], "1");
        assert_eq!(summary.rows[2][1], "0");
        assert!(summary.rows[3][1].contains(" to "));
        assert!(summary.rows[3][2].starts_with("Generated on "));
    }

    #[test]
    fn test_long_paths_are_truncated() {
        let user = UserInfo { name: "alice".into() };
        let path = format!("/srv/share/{}", "nested/".repeat(20));
        let files = vec![Record::file(RecordKind::NetworkDrive, path, now(), "proc_mounts")];
        let story = build_story(&input(&user, &[], &files, &[]));

        let cell = &tables(&story)[1].rows[0][0];
        assert_eq!(cell.chars().count(), 50);
        assert!(cell.ends_with("..."));
    }

    #[test]
    fn test_app_sub_tables_are_omitted_when_empty() {
        let user = UserInfo { name: "alice".into() };
        let apps = vec![Record::installed_app(
            InstalledAppDetails {
                name: "A very long application name that keeps going and going".into(),
                path: "pkg".into(),
                install_date: None,
            },
            "dpkg",
        )];
        let story = build_story(&input(&user, &[], &[], &apps));

        assert!(!story.contains(&Block::Subheading("Currently Running Processes".into())));
        assert!(story.contains(&Block::Subheading("Installed Applications".into())));
        let installed = tables(&story)[1];
        assert_eq!(installed.rows[0][1], "N/A");
        assert_eq!(installed.rows[0][0].chars().count(), 50);
    }

    #[test]
    fn test_process_rows() {
        let user = UserInfo { name: "alice".into() };
        let apps = (0..17)
            .map(|pid| {
                Record::running_process(
                    ProcessDetails {
                        name: "worker".into(),
                        path: "/usr/bin/worker".into(),
                        pid,
                        cpu_percent: 12.345,
                        memory_percent: 0.05,
                    },
                    None,
                    "sysinfo",
                )
            })
            .collect::<Vec<_>>();
        let story = build_story(&input(&user, &[], &[], &apps));

        let processes = tables(&story)[1];
        assert_eq!(processes.rows.len(), 15);
        assert_eq!(processes.rows[0][2], "12.3");
        assert_eq!(processes.rows[0][3], "0.1");
        assert_eq!(processes.rows[0][4], "N/A");
        assert!(paragraphs(&story)
            .contains(&"Showing 15 of 17 running processes (2 more not shown)."));
    }
}
