mod common;

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use std::time::Duration;
    use tokio::time::Instant;

    use fullpage_shot::screenshot::config::{CaptureConfig, IdleConfig, PrewarmConfig};
    use fullpage_shot::screenshot::{
        capture_grid_and_stitch, capture_url, freeze_motion_media, prewarm_page,
        wait_for_soft_idle, CaptureError, IdleOutcome, Viewport,
    };
    use fullpage_shot::utils::benchmarking::PhaseTimer;

    use crate::common::{assert_matches_page, FakePage};

    fn no_overlap() -> CaptureConfig {
        let mut config = CaptureConfig::default();
        config.tiling.overlap_x_ratio = 0.0;
        config.tiling.overlap_y_ratio = 0.0;
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_shorter_than_viewport() -> Result<()> {
        let page = FakePage::new((200, 100), (150, 60)).with_dpr(2.0);

        let image = capture_grid_and_stitch(&page, &CaptureConfig::default()).await?;

        assert_eq!(image.tiles, 1);
        assert_eq!((image.width, image.height), (300, 120));
        assert_eq!(page.grid_shots(), vec![(0, 0)]);
        assert_eq!(assert_matches_page(&image.png), (300, 120));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_viewports_without_overlap() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 300));

        let image = capture_grid_and_stitch(&page, &no_overlap()).await?;

        assert_eq!(page.grid_shots(), vec![(0, 0), (0, 100), (0, 200)]);
        // headers only in the first row
        assert_eq!(page.grid_overlays_hidden(), vec![false, true, true]);
        assert_eq!(assert_matches_page(&image.png), (200, 300));

        let state = page.state();
        assert!(!state.overlays_hidden);
        assert!(!state.overlays_marked);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_grid_stitches_exactly() -> Result<()> {
        let page = FakePage::new((200, 100), (350, 250));
        let mut config = CaptureConfig::default();
        config.tiling.overlap_x_ratio = 0.0;

        let image = capture_grid_and_stitch(&page, &config).await?;

        // 5% of 100px overlap between rows, last row pinned to the bottom
        assert_eq!(
            page.grid_shots(),
            vec![(0, 0), (150, 0), (0, 95), (150, 95), (0, 150), (150, 150)]
        );
        assert_eq!(image.tiles, 6);
        assert_eq!(assert_matches_page(&image.png), (350, 250));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_dpr_grid_stitches_exactly() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 260)).with_dpr(2.0);

        let image = capture_grid_and_stitch(&page, &no_overlap()).await?;

        assert_eq!(page.grid_shots(), vec![(0, 0), (0, 100), (0, 160)]);
        assert_eq!(assert_matches_page(&image.png), (400, 520));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_tile_cap_stops_capture_without_error() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 1000));
        let mut config = no_overlap();
        config.tiling.max_tiles = 4;

        let image = capture_grid_and_stitch(&page, &config).await?;

        assert_eq!(image.tiles, 4);
        assert_eq!(page.grid_shots().len(), 4);
        assert_eq!(assert_matches_page(&image.png), (200, 400));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_tile_cap_shared_across_columns() -> Result<()> {
        let page = FakePage::new((200, 100), (400, 1000));
        let mut config = no_overlap();
        config.tiling.max_tiles = 2;

        let image = capture_grid_and_stitch(&page, &config).await?;

        assert_eq!(page.grid_shots(), vec![(0, 0), (200, 0)]);
        assert_eq!(assert_matches_page(&image.png), (400, 100));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_retried_screenshot_is_transparent() -> Result<()> {
        let clean = FakePage::new((200, 100), (200, 300));
        let flaky = FakePage::new((200, 100), (200, 300));
        // call 0 is the planning probe, call 2 is the second grid tile
        flaky.state().failing_shots = vec![2];

        let expected = capture_grid_and_stitch(&clean, &no_overlap()).await?;
        let retried = capture_grid_and_stitch(&flaky, &no_overlap()).await?;

        assert_eq!(flaky.state().shot_calls, clean.state().shot_calls + 1);
        assert_eq!(retried.png, expected.png);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_fail_and_restore_overlays() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 300));
        page.state().failing_shots = vec![2, 3];

        let result = capture_grid_and_stitch(&page, &no_overlap()).await;

        match result {
            Err(CaptureError::Screenshot { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected a screenshot error, got {:?}", other.map(|i| i.tiles)),
        }
        let state = page.state();
        assert!(!state.overlays_hidden);
        assert!(!state.overlays_marked);
        assert_eq!(state.overlay_log.last().map(|(_, hidden)| *hidden), Some(false));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_overlay_marking_still_captures() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 300));
        page.state().failing_scripts = vec!["mark_overlays"];

        let image = capture_grid_and_stitch(&page, &no_overlap()).await?;

        assert_eq!(image.tiles, 3);
        assert!(page.state().overlay_log.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_partially_marked_overlays_are_cleared() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 300));
        page.state().mark_fails_after_tagging = true;

        let image = capture_grid_and_stitch(&page, &no_overlap()).await?;

        assert_eq!(image.tiles, 3);
        let state = page.state();
        assert!(!state.overlays_marked);
        assert!(state.scripts_run.contains(&"clear_overlay_marks"));
        // nothing was counted as marked, so rows never toggle
        assert!(state.overlay_log.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_overlays_leave_page_alone() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 300));
        let mut config = no_overlap();
        config.overlay.enabled = false;

        capture_grid_and_stitch(&page, &config).await?;

        let state = page.state();
        assert!(!state.scripts_run.contains(&"mark_overlays"));
        assert!(!state.scripts_run.contains(&"clear_overlay_marks"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_growing_content_is_bounded_by_canvas() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 300));
        page.state().content_height_after_capture = Some(900);

        let image = capture_grid_and_stitch(&page, &no_overlap()).await?;

        assert_eq!(assert_matches_page(&image.png), (200, 300));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrinking_content_trims_output() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 300));
        page.state().content_height_after_capture = Some(250);

        let image = capture_grid_and_stitch(&page, &no_overlap()).await?;

        assert_eq!((image.width, image.height), (200, 250));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_freeze_is_idempotent() {
        let page = FakePage::new((200, 100), (200, 300));
        let config = CaptureConfig::default();

        let first = freeze_motion_media(&page, &config.freeze).await;
        let second = freeze_motion_media(&page, &config.freeze).await;

        assert!(first.style_injected);
        assert_eq!(first.gifs_frozen, 2);
        assert!(first.failed.is_empty());
        assert!(!second.style_injected);
        assert_eq!(second.gifs_frozen, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_freeze_failure_does_not_stop_other_strategies() {
        let page = FakePage::new((200, 100), (200, 300));
        page.state().failing_scripts = vec!["pause_videos"];

        let report = freeze_motion_media(&page, &CaptureConfig::default().freeze).await;

        assert_eq!(report.failed, vec!["pause_videos"]);
        assert!(report.style_injected);
        assert_eq!(report.svg_nodes_stripped, 3);
        assert_eq!(report.gifs_frozen, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_returns_after_quiet_period() {
        let page = FakePage::new((200, 100), (200, 300));
        let config = IdleConfig::default();

        let started = Instant::now();
        let outcome = wait_for_soft_idle(&page, &config).await;

        assert_eq!(outcome, IdleOutcome::Idle);
        assert!(started.elapsed() >= config.quiet());
        assert!(started.elapsed() < config.max_window());
        let state = page.state();
        assert_eq!(state.probe_detaches, 1);
        assert!(!state.probe_attached);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_waits_for_burst_to_finish() {
        let page = FakePage::new((200, 100), (200, 300));
        {
            let mut state = page.state();
            state.network_batches.push_back(vec!["start"; 5]);
            state.network_batches.push_back(vec![]);
            state.network_batches.push_back(vec!["finish", "finish", "fail", "finish"]);
        }
        let config = IdleConfig::default();

        let started = Instant::now();
        let outcome = wait_for_soft_idle(&page, &config).await;

        assert_eq!(outcome, IdleOutcome::Idle);
        // quiet period starts at the third drain
        assert!(started.elapsed() >= config.poll_interval() * 2 + config.quiet());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_is_bounded_by_max_window() {
        let page = FakePage::new((200, 100), (200, 300));
        page.state().network_always_busy = true;
        let config = IdleConfig::default();

        let started = Instant::now();
        let outcome = wait_for_soft_idle(&page, &config).await;

        assert_eq!(outcome, IdleOutcome::TimedOut);
        assert!(started.elapsed() >= config.max_window());
        assert!(started.elapsed() <= config.max_window() + config.poll_interval());
        assert_eq!(page.state().probe_detaches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_skipped_when_probe_unavailable() {
        let page = FakePage::new((200, 100), (200, 300));
        page.state().failing_scripts = vec!["attach_network_probe"];

        let started = Instant::now();
        let outcome = wait_for_soft_idle(&page, &IdleConfig::default()).await;

        assert_eq!(outcome, IdleOutcome::Unavailable);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(page.state().probe_detaches, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_detaches_after_drain_failure() {
        let page = FakePage::new((200, 100), (200, 300));
        page.state().failing_scripts = vec!["drain_network_events"];

        let outcome = wait_for_soft_idle(&page, &IdleConfig::default()).await;

        assert_eq!(outcome, IdleOutcome::TimedOut);
        assert_eq!(page.state().probe_detaches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prewarm_scrolls_to_bottom_and_back() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 1000));

        let report = prewarm_page(&page, &PrewarmConfig::default(), &IdleConfig::default()).await?;

        assert_eq!(report.steps, 9);
        assert!(report.reached_bottom);
        assert_eq!(report.idle, IdleOutcome::Idle);
        assert_eq!(page.state().scroll, (0, 0));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_prewarm_respects_step_limit() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 100_000));
        let config = PrewarmConfig {
            max_steps: 3,
            step_px: Some(50),
            ..PrewarmConfig::default()
        };

        let report = prewarm_page(&page, &config, &IdleConfig::default()).await?;

        assert_eq!(report.steps, 3);
        assert!(!report.reached_bottom);
        assert_eq!(page.state().scroll, (0, 0));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_url_runs_every_phase() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 300));
        let mut timer = PhaseTimer::new();

        let image = capture_url(
            &page,
            "https://example.com/",
            Viewport { width: 200, height: 100 },
            &CaptureConfig::default(),
            &mut timer,
        )
        .await?;

        assert_eq!(assert_matches_page(&image.png), (200, 300));
        assert_eq!(page.state().navigated.as_deref(), Some("https://example.com/"));

        let phases: Vec<&str> = timer.phases().iter().map(|p| p.name).collect();
        assert_eq!(
            phases,
            vec!["viewport", "navigate", "ready", "normalize", "idle", "prewarm", "settle", "capture"]
        );

        let scripts = page.state().scripts_run.clone();
        let position = |name: &str| scripts.iter().position(|s| *s == name);
        assert!(position("eager_load_media") < position("attach_network_probe"));
        assert!(position("scroll_by") < position("inject_freeze_style"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_url_fits_viewport_inside_window_chrome() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 300));
        page.state().chrome = (10, 80);

        let image = capture_url(
            &page,
            "https://example.com/",
            Viewport { width: 200, height: 100 },
            &CaptureConfig::default(),
            &mut PhaseTimer::new(),
        )
        .await?;

        assert_eq!(page.state().window, (210, 180));
        assert_eq!(assert_matches_page(&image.png), (200, 300));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_url_continues_when_never_ready() -> Result<()> {
        let page = FakePage::new((200, 100), (200, 300));
        page.state().ready_state = "interactive";

        let image = capture_url(
            &page,
            "https://example.com/",
            Viewport { width: 200, height: 100 },
            &CaptureConfig::default(),
            &mut PhaseTimer::new(),
        )
        .await?;

        assert_eq!((image.width, image.height), (200, 300));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_failure_takes_no_screenshot() {
        let page = FakePage::new((200, 100), (200, 300));
        page.state().fail_navigation = true;

        let result = capture_url(
            &page,
            "https://nonexistent.invalid/",
            Viewport { width: 200, height: 100 },
            &CaptureConfig::default(),
            &mut PhaseTimer::new(),
        )
        .await;

        assert!(matches!(result, Err(CaptureError::Navigation { .. })));
        assert_eq!(page.state().shot_calls, 0);
    }
}
