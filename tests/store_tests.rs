use inequality_dashboard::DashboardError;
use inequality_dashboard::feedback::{FeedbackRecord, FeedbackStore};
use inequality_dashboard::users::{Role, UserRecord, UserStore};
use std::fs;
use std::sync::Arc;
use std::thread;

fn record(name: &str, email: &str) -> UserRecord {
    UserRecord {
        email: email.to_string(),
        password: "$argon2id$placeholder".to_string(),
        name: name.to_string(),
        phone: None,
        role: Role::User,
        extra: Vec::new(),
    }
}

fn seeded(dir: &tempfile::TempDir) -> UserStore {
    let store = UserStore::new(dir.path().join("users.csv"));
    store.insert(&record("Ada", "ada@example.com")).unwrap();
    store.insert(&record("Grace", "grace@example.com")).unwrap();
    store.insert(&record("Linus", "linus@example.com")).unwrap();
    store
}

#[test]
fn find_and_exists() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(&dir);

    let grace = store.find_by_email("grace@example.com").unwrap().unwrap();
    assert_eq!(grace.name, "Grace");
    assert_eq!(grace.role, Role::User);
    assert!(store.exists("linus@example.com").unwrap());
    assert!(!store.exists("nobody@example.com").unwrap());
    assert!(store.find_by_email("nobody@example.com").unwrap().is_none());
}

#[test]
fn exists_is_false_before_any_sign_up() {
    let dir = tempfile::tempdir().unwrap();
    let store = UserStore::new(dir.path().join("users.csv"));
    assert!(!store.has_table());
    assert!(!store.exists("a@b.c").unwrap());
}

#[test]
fn duplicate_insert_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(&dir);
    let path = dir.path().join("users.csv");
    let before = fs::read(&path).unwrap();

    let err = store.insert(&record("Imposter", "ada@example.com")).unwrap_err();
    assert!(matches!(err, DashboardError::DuplicateAccount(ref e) if e == "ada@example.com"));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn update_changes_only_the_matching_row() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(&dir);
    let path = dir.path().join("users.csv");
    let before = fs::read_to_string(&path).unwrap();

    store.update("grace@example.com", "Phone", "5550100").unwrap();

    let after = fs::read_to_string(&path).unwrap();
    let before_lines: Vec<&str> = before.lines().collect();
    let after_lines: Vec<&str> = after.lines().collect();
    assert_eq!(before_lines.len(), after_lines.len());
    for (i, (b, a)) in before_lines.iter().zip(&after_lines).enumerate() {
        if a.contains("grace@example.com") {
            assert_ne!(b, a);
            assert!(a.contains("5550100"));
        } else {
            assert_eq!(b, a, "line {} changed", i);
        }
    }

    let grace = store.find_by_email("grace@example.com").unwrap().unwrap();
    assert_eq!(grace.phone.as_deref(), Some("5550100"));
}

#[test]
fn update_reports_missing_row_and_column() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(&dir);

    let err = store.update("nobody@example.com", "Name", "x").unwrap_err();
    assert!(matches!(err, DashboardError::NotFound(_)));

    let err = store.update("ada@example.com", "Shoe size", "44").unwrap_err();
    assert!(matches!(err, DashboardError::NotFound(_)));
}

#[test]
fn update_refuses_key_and_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(&dir);
    for field in ["Email", "password", " ROLE "] {
        let err = store.update("ada@example.com", field, "x").unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)), "{}", field);
    }
}

#[test]
fn update_many_is_all_or_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(&dir);
    let path = dir.path().join("users.csv");
    let before = fs::read(&path).unwrap();

    let fields = vec![
        ("Name".to_string(), "Ada L.".to_string()),
        ("Shoe size".to_string(), "38".to_string()),
    ];
    assert!(store.update_many("ada@example.com", &fields).is_err());
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn extra_columns_survive_and_show_up_in_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.csv");
    fs::write(
        &path,
        "Name,Email,Password,Phone,Country,City\nAda,ada@example.com,h,5551234.0,UK,London\n",
    )
    .unwrap();
    let store = UserStore::new(&path);

    let ada = store.find_by_email("ada@example.com").unwrap().unwrap();
    assert_eq!(
        ada.profile_fields(),
        vec![
            ("Name".to_string(), "Ada".to_string()),
            ("Phone".to_string(), "5551234".to_string()),
            ("Country".to_string(), "UK".to_string()),
            ("City".to_string(), "London".to_string()),
        ]
    );

    store.update("ada@example.com", "country", "Ireland").unwrap();
    let ada = store.find_by_email("ada@example.com").unwrap().unwrap();
    assert_eq!(ada.extra[0], ("Country".to_string(), "Ireland".to_string()));
}

#[test]
fn hand_written_rows_keep_every_cell() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.csv");
    fs::write(
        &path,
        "Name,Email,Password,Phone\n\
         Ada,ada@example.com,h,5551234\n\
         Bob,bob@example.com,h,5550000,extra\n\
         Cy,cy@example.com\n",
    )
    .unwrap();
    let store = UserStore::new(&path);

    store.update("ada@example.com", "Phone", "2").unwrap();

    let after = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = after.lines().collect();
    assert_eq!(lines[1], "Ada,ada@example.com,h,2");
    assert_eq!(lines[2], "Bob,bob@example.com,h,5550000,extra");
    assert_eq!(lines[3], "Cy,cy@example.com");

    // The short row can still be edited; only it grows.
    store.update("cy@example.com", "Phone", "7").unwrap();
    let after = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = after.lines().collect();
    assert_eq!(lines[2], "Bob,bob@example.com,h,5550000,extra");
    assert_eq!(lines[3], "Cy,cy@example.com,,7");

    // The unnamed column is not a profile field.
    let bob = store.find_by_email("bob@example.com").unwrap().unwrap();
    assert!(bob.extra.is_empty());
}

#[test]
fn concurrent_inserts_are_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(UserStore::new(dir.path().join("users.csv")));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .insert(&record(&format!("User {}", i), &format!("u{}@example.com", i)))
                    .unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let table = store.load_table().unwrap();
    assert_eq!(table.rows.len(), 8);
    for i in 0..8 {
        assert!(store.exists(&format!("u{}@example.com", i)).unwrap());
    }
}

#[test]
fn concurrent_signups_for_one_email_have_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(UserStore::new(dir.path().join("users.csv")));

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || store.insert(&record(&format!("Racer {}", i), "same@example.com")))
        })
        .collect();
    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|r| r.is_ok())
        .count();

    assert_eq!(wins, 1);
    assert_eq!(store.load_table().unwrap().rows.len(), 1);
}

#[test]
fn feedback_is_appended_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = FeedbackStore::new(dir.path().join("feedback.csv"));
    assert!(matches!(store.load_table(), Err(DashboardError::NotFound(_))));

    for (i, text) in ["great", "needs more, charts", "\"quoted\" text"].iter().enumerate() {
        store
            .append(&FeedbackRecord {
                name: format!("N{}", i),
                email: format!("n{}@example.com", i),
                feedback: text.to_string(),
            })
            .unwrap();
    }

    let table = store.load_table().unwrap();
    assert_eq!(table.rows.len(), 3);
    let feedback = table.column("Feedback").unwrap();
    assert_eq!(table.cell(1, feedback), "needs more, charts");
    assert_eq!(table.cell(2, feedback), "\"quoted\" text");
    assert!(table.column("Submitted").is_some());
}

#[test]
fn blank_feedback_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FeedbackStore::new(dir.path().join("feedback.csv"));
    let err = store
        .append(&FeedbackRecord {
            name: "x".into(),
            email: "x@example.com".into(),
            feedback: "   ".into(),
        })
        .unwrap_err();
    assert!(matches!(err, DashboardError::Validation(_)));
    assert!(!dir.path().join("feedback.csv").exists());
}
