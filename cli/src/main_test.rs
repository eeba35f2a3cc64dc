use super::*;

fn portal_router() -> Router<Page> {
    portal::router(&RoutingConfig::default()).unwrap()
}

fn walk_args(paths: &[&str], session: SessionState, resolve_to: Option<SessionState>) -> WalkArgs {
    WalkArgs {
        paths: paths.iter().map(|p| (*p).to_owned()).collect(),
        start: "/courses".to_owned(),
        session,
        resolve_to,
    }
}

#[test]
fn cli_parses_resolve_with_session() {
    let cli = Cli::try_parse_from(["portal-routes", "resolve", "/profile", "--session", "authenticated", "--follow"])
        .unwrap();
    let Command::Resolve(args) = cli.command else {
        panic!("expected resolve");
    };
    assert_eq!(args.session, SessionState::Authenticated);
    assert!(args.follow);
    assert_eq!(args.paths, vec!["/profile"]);
}

#[test]
fn cli_rejects_unknown_session_state() {
    assert!(Cli::try_parse_from(["portal-routes", "resolve", "/", "--session", "maybe"]).is_err());
}

#[test]
fn table_rows_end_with_fallback() {
    let rows = table_rows(&portal_router());
    assert_eq!(rows.len(), 7);
    let last = rows.last().unwrap();
    assert_eq!(last.pattern, "*");
    assert_eq!(last.target, "redirect /login");
    assert_eq!(rows[4].visibility, "protected");
    assert_eq!(rows[4].chrome, vec!["main"]);
}

#[test]
fn describe_mentions_chrome_and_guard_redirect() {
    let router = portal_router();
    let page = router.resolve("/my-schedule", &SessionState::Authenticated);
    assert_eq!(describe(&page), "push /my-schedule (protected /my-schedule) -> My Schedule [main]");

    let denied = router.resolve("/profile", &SessionState::Unauthenticated);
    assert_eq!(describe(&denied), "push /profile (protected /profile) -> redirect /login (replace=true)");
}

#[test]
fn walk_denied_page_replaces_history_entry() {
    let mut router = portal_router();
    let args = walk_args(&["/profile"], SessionState::Unauthenticated, None);
    let report = walk(&mut router, &RoutingConfig::default(), &args).unwrap();

    assert_eq!(report.history, vec!["/courses", "/login"]);
    assert_eq!(report.current, "/login");
    assert_eq!(report.steps.last().and_then(|s| s.target.page().copied()), Some(Page::Login));
}

#[test]
fn walk_pending_then_authenticated_lands_on_requested_page() {
    let mut router = portal_router();
    let args = walk_args(&["/my-schedule"], SessionState::Pending, Some(SessionState::Authenticated));
    let report = walk(&mut router, &RoutingConfig::default(), &args).unwrap();

    assert!(report.steps[0].target.is_suspended());
    assert_eq!(report.steps.last().and_then(|s| s.target.page().copied()), Some(Page::MySchedule));
    assert_eq!(report.current, "/my-schedule");
}

#[test]
fn walk_follows_root_redirect() {
    let mut router = portal_router();
    let args = walk_args(&["/"], SessionState::Authenticated, None);
    let report = walk(&mut router, &RoutingConfig::default(), &args).unwrap();

    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.history, vec!["/courses", "/courses"]);
}

#[test]
fn load_config_prefers_flag_over_default() {
    let config = load_config(Some("/sign-in".to_owned()), None).unwrap();
    assert_eq!(config.login_path, "/sign-in");
}

#[test]
fn load_config_without_flags_reads_environment() {
    let expected = RoutingConfig::from_env().unwrap();
    assert_eq!(load_config(None, None).unwrap(), expected);
}
