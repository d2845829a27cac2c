use std::sync::Arc;

use chrono::{Duration, Utc};
use jobboard_backend::{
    config::Config,
    dto::{
        interview_dto::{InterviewDetails, UpdateInterviewPayload},
        job_dto::CreateJobPayload,
    },
    error::{Error, ErrorKind},
    models::{
        application::{ApplicantProfile, Application, ApplicationStatus},
        interview::{InterviewMode, InterviewStatus},
        job::Job,
        user::{Role, User},
    },
    services::{
        access::Actor,
        memory_store::MemoryStore,
        notification_service::LogMailer,
        store::{ApplicationFilter, Store},
        upload_service::LocalUploader,
    },
    AppState,
};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

struct World {
    state: AppState,
    seeker: Actor,
    other_seeker: Actor,
    recruiter: Actor,
    other_recruiter: Actor,
    admin: Actor,
    job: Job,
}

async fn user(state: &AppState, name: &str, role: Role) -> Actor {
    let user = User::new(
        name.to_string(),
        &format!("{}-{}@example.com", name, Uuid::new_v4()),
        "unused-hash".into(),
        role,
    );
    state.store.insert_user(&user).await.expect("insert user");
    Actor::new(user.id, role)
}

async fn world() -> World {
    let root = std::env::temp_dir().join(format!("jobboard-lifecycle-{}", Uuid::new_v4()));
    let mut config = Config::local("lifecycle-secret");
    config.uploads_dir = root.to_string_lossy().into_owned();

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let state = AppState::new(
        Arc::new(config),
        store,
        Arc::new(LogMailer),
        Arc::new(LocalUploader::new(root, "resumes")),
    );

    let seeker = user(&state, "ann", Role::Jobseeker).await;
    let other_seeker = user(&state, "ben", Role::Jobseeker).await;
    let recruiter = user(&state, "rita", Role::Recruiter).await;
    let other_recruiter = user(&state, "ray", Role::Recruiter).await;
    let admin = user(&state, "ada", Role::Admin).await;

    let job = state
        .job_service
        .create(
            &recruiter,
            CreateJobPayload {
                title: "Platform Engineer".into(),
                company: "Acme".into(),
                location: "Berlin".into(),
                salary: Some("70k".into()),
                description: "Keep the lights on".into(),
                skills: vec!["rust".into(), "postgres".into()],
                job_type: None,
                is_open: None,
                recruiter_id: None,
            },
        )
        .await
        .expect("create job");

    World {
        state,
        seeker,
        other_seeker,
        recruiter,
        other_recruiter,
        admin,
        job,
    }
}

fn details() -> InterviewDetails {
    InterviewDetails {
        date: Utc::now() + Duration::days(3),
        mode: InterviewMode::Online,
        location: "https://meet.example.com/abc".into(),
        notes: Some("Bring a laptop".into()),
    }
}

async fn submit(w: &World, actor: &Actor) -> Application {
    w.state
        .application_service
        .submit(
            actor,
            w.job.id,
            Some("/uploads/resumes/cv.pdf".into()),
            ApplicantProfile::default(),
        )
        .await
        .expect("submit")
        .value
}

async fn advance(w: &World, id: Uuid, target: ApplicationStatus) -> Application {
    w.state
        .application_service
        .advance(&w.recruiter, id, target, None)
        .await
        .expect("advance")
        .value
        .application
}

/// Every application at `interview_scheduled` has an interview pointing back at it.
async fn assert_binding_holds(w: &World) {
    let all = w
        .state
        .store
        .list_applications(&ApplicationFilter::default())
        .await
        .unwrap();
    for app in all {
        if app.status == ApplicationStatus::InterviewScheduled {
            let iid = app.interview_id.expect("scheduled application without interview");
            let interview = w.state.store.find_interview(iid).await.unwrap().unwrap();
            assert_eq!(interview.application_id, app.id);
        }
    }
}

#[tokio::test]
async fn duplicate_submission_conflicts() {
    let w = world().await;
    let app = submit(&w, &w.seeker).await;
    assert_eq!(app.status, ApplicationStatus::Applied);
    assert_eq!(app.recruiter_id, w.recruiter.id);

    let err = w
        .state
        .application_service
        .submit(&w.seeker, w.job.id, Some("/x.pdf".into()), Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Someone else can still apply.
    submit(&w, &w.other_seeker).await;
}

#[tokio::test]
async fn submission_to_unknown_job_is_not_found() {
    let w = world().await;
    let err = w
        .state
        .application_service
        .submit(&w.seeker, Uuid::new_v4(), Some("/x.pdf".into()), Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn shortlist_then_schedule_links_interview() {
    let w = world().await;
    let app = submit(&w, &w.seeker).await;
    advance(&w, app.id, ApplicationStatus::Shortlisted).await;

    let scheduled = w
        .state
        .interview_service
        .schedule(&w.recruiter, app.id, details())
        .await
        .unwrap()
        .value;
    assert_eq!(scheduled.application.status, ApplicationStatus::InterviewScheduled);
    assert_eq!(scheduled.application.interview_id, Some(scheduled.interview.id));
    assert_eq!(scheduled.interview.status, InterviewStatus::Scheduled);
    assert_eq!(scheduled.interview.job_title.as_deref(), Some("Platform Engineer"));
    assert_eq!(scheduled.interview.recruiter_id, w.recruiter.id);
    assert_binding_holds(&w).await;

    let err = w
        .state
        .interview_service
        .schedule(&w.recruiter, app.id, details())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn advance_to_interview_scheduled_books_interview() {
    let w = world().await;
    let app = submit(&w, &w.seeker).await;

    let advanced = w
        .state
        .application_service
        .advance(
            &w.recruiter,
            app.id,
            ApplicationStatus::InterviewScheduled,
            Some(details()),
        )
        .await
        .unwrap()
        .value;
    assert_eq!(advanced.application.status, ApplicationStatus::InterviewScheduled);
    let interview = advanced.interview.expect("interview booked");
    assert_eq!(advanced.application.interview_id, Some(interview.id));
    assert_binding_holds(&w).await;
}

#[tokio::test]
async fn foreign_recruiter_is_forbidden_everywhere() {
    let w = world().await;
    let app = submit(&w, &w.seeker).await;
    let svc = &w.state.application_service;

    let err = svc
        .advance(&w.other_recruiter, app.id, ApplicationStatus::Reviewed, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = svc.view(&w.other_recruiter, app.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = svc.view(&w.other_seeker, app.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = svc.cancel(&w.other_seeker, app.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = w
        .state
        .interview_service
        .schedule(&w.other_recruiter, app.id, details())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = svc
        .list_for_job(&w.other_recruiter, w.job.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    assert_ok!(svc.view(&w.seeker, app.id).await);
    assert_ok!(svc.view(&w.recruiter, app.id).await);
    assert_ok!(svc.view(&w.admin, app.id).await);
}

#[tokio::test]
async fn hired_application_is_frozen() {
    let w = world().await;
    let app = submit(&w, &w.seeker).await;
    advance(&w, app.id, ApplicationStatus::Hired).await;

    let err = w
        .state
        .application_service
        .cancel(&w.seeker, app.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    for target in ApplicationStatus::ALL {
        let res = w
            .state
            .application_service
            .advance(&w.admin, app.id, target, Some(details()))
            .await;
        let err = assert_err!(res);
        assert_eq!(err.kind(), ErrorKind::Conflict, "{target}");
    }

    let err = w
        .state
        .interview_service
        .schedule(&w.recruiter, app.id, details())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn removing_interview_reverts_to_shortlisted() {
    let w = world().await;
    let app = submit(&w, &w.seeker).await;
    advance(&w, app.id, ApplicationStatus::Shortlisted).await;
    let scheduled = w
        .state
        .interview_service
        .schedule(&w.recruiter, app.id, details())
        .await
        .unwrap()
        .value;

    let removed = w
        .state
        .interview_service
        .remove(&w.recruiter, scheduled.interview.id)
        .await
        .unwrap()
        .value;
    let released = removed.application.expect("application released");
    assert_eq!(released.status, ApplicationStatus::Shortlisted);
    assert!(released.interview_id.is_none());

    let missing = w.state.store.find_interview(scheduled.interview.id).await.unwrap();
    assert!(missing.is_none());
    assert_binding_holds(&w).await;

    // A fresh interview can be booked afterwards.
    assert_ok!(
        w.state
            .interview_service
            .schedule(&w.recruiter, app.id, details())
            .await
    );
}

#[tokio::test]
async fn removing_interview_after_hire_keeps_outcome() {
    let w = world().await;
    let app = submit(&w, &w.seeker).await;
    let scheduled = w
        .state
        .interview_service
        .schedule(&w.recruiter, app.id, details())
        .await
        .unwrap()
        .value;
    advance(&w, app.id, ApplicationStatus::Hired).await;

    let removed = w
        .state
        .interview_service
        .remove(&w.admin, scheduled.interview.id)
        .await
        .unwrap()
        .value;
    let app = removed.application.expect("reference cleared");
    assert_eq!(app.status, ApplicationStatus::Hired);
    assert!(app.interview_id.is_none());
}

#[tokio::test]
async fn cancel_then_reapply_creates_new_application() {
    let w = world().await;
    let first = submit(&w, &w.seeker).await;

    let cancelled = w
        .state
        .application_service
        .cancel(&w.seeker, first.id)
        .await
        .unwrap()
        .value;
    assert_eq!(cancelled.application.status, ApplicationStatus::Cancelled);

    let second = submit(&w, &w.seeker).await;
    assert_ne!(second.id, first.id);
    assert_eq!(second.status, ApplicationStatus::Applied);

    let old = w.state.store.find_application(first.id).await.unwrap().unwrap();
    assert_eq!(old.status, ApplicationStatus::Cancelled);

    let mine = w
        .state
        .application_service
        .list_mine(&w.seeker, None)
        .await
        .unwrap();
    let live: Vec<_> = mine
        .iter()
        .filter(|a| a.status != ApplicationStatus::Cancelled)
        .collect();
    assert_eq!(mine.len(), 2);
    assert_eq!(live.len(), 1);

    let err = w
        .state
        .application_service
        .cancel(&w.seeker, first.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn cancelling_marks_live_interview_cancelled_and_keeps_link() {
    let w = world().await;
    let app = submit(&w, &w.seeker).await;
    let scheduled = w
        .state
        .interview_service
        .schedule(&w.recruiter, app.id, details())
        .await
        .unwrap()
        .value;

    let withdrawn = w
        .state
        .application_service
        .cancel(&w.seeker, app.id)
        .await
        .unwrap()
        .value;
    assert_eq!(withdrawn.application.status, ApplicationStatus::Cancelled);
    assert_eq!(withdrawn.application.interview_id, Some(scheduled.interview.id));
    let interview = withdrawn.interview.expect("interview cancelled with application");
    assert_eq!(interview.status, InterviewStatus::Cancelled);

    let err = w
        .state
        .interview_service
        .update(
            &w.recruiter,
            interview.id,
            UpdateInterviewPayload {
                notes: Some("too late".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn admin_may_cancel_through_advance() {
    let w = world().await;
    let app = submit(&w, &w.seeker).await;

    let err = w
        .state
        .application_service
        .advance(&w.recruiter, app.id, ApplicationStatus::Cancelled, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let advanced = w
        .state
        .application_service
        .advance(&w.admin, app.id, ApplicationStatus::Cancelled, None)
        .await
        .unwrap()
        .value;
    assert_eq!(advanced.application.status, ApplicationStatus::Cancelled);
}

#[tokio::test]
async fn observed_statuses_never_go_backwards() {
    let w = world().await;
    let app = submit(&w, &w.seeker).await;
    let mut seen = vec![app.status];

    let attempts = [
        ApplicationStatus::Reviewed,
        ApplicationStatus::Applied,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Reviewed,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Hired,
    ];
    for target in attempts {
        let _ = w
            .state
            .application_service
            .advance(&w.recruiter, app.id, target, None)
            .await;
        let current = w.state.store.find_application(app.id).await.unwrap().unwrap();
        seen.push(current.status);
    }

    for pair in seen.windows(2) {
        assert!(pair[1].rank() >= pair[0].rank(), "{:?}", seen);
    }
    assert_eq!(seen.last(), Some(&ApplicationStatus::Rejected));
}

#[tokio::test]
async fn interview_updates_follow_their_own_state_machine() {
    let w = world().await;
    let app = submit(&w, &w.seeker).await;
    let scheduled = w
        .state
        .interview_service
        .schedule(&w.recruiter, app.id, details())
        .await
        .unwrap()
        .value;
    let svc = &w.state.interview_service;

    let moved = svc
        .update(
            &w.recruiter,
            scheduled.interview.id,
            UpdateInterviewPayload {
                date: Some(Utc::now() + Duration::days(5)),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .value;
    assert_eq!(moved.status, InterviewStatus::Rescheduled);

    let err = svc
        .update(
            &w.other_recruiter,
            moved.id,
            UpdateInterviewPayload::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = svc
        .update(
            &w.recruiter,
            moved.id,
            UpdateInterviewPayload {
                status: Some(InterviewStatus::Scheduled),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let done = svc
        .update(
            &w.recruiter,
            moved.id,
            UpdateInterviewPayload {
                status: Some(InterviewStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .value;
    assert_eq!(done.status, InterviewStatus::Completed);

    // Completing the interview leaves the application where it was.
    let app = w.state.store.find_application(app.id).await.unwrap().unwrap();
    assert_eq!(app.status, ApplicationStatus::InterviewScheduled);
    assert_binding_holds(&w).await;
}

#[tokio::test]
async fn schedule_rejects_bad_details() {
    let w = world().await;
    let app = submit(&w, &w.seeker).await;
    let svc = &w.state.interview_service;

    let mut past = details();
    past.date = Utc::now() - Duration::days(1);
    let err = svc.schedule(&w.recruiter, app.id, past).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let mut blank = details();
    blank.location = "   ".into();
    let err = svc.schedule(&w.recruiter, app.id, blank).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = svc
        .schedule(&w.recruiter, Uuid::new_v4(), details())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn removing_job_cancels_open_applications_only() {
    let w = world().await;
    let open = submit(&w, &w.seeker).await;
    let hired = submit(&w, &w.other_seeker).await;
    advance(&w, hired.id, ApplicationStatus::Hired).await;
    let scheduled = w
        .state
        .interview_service
        .schedule(&w.recruiter, open.id, details())
        .await
        .unwrap()
        .value;

    let cancelled = w.state.job_service.remove(&w.recruiter, w.job.id).await.unwrap();
    assert_eq!(cancelled, 1);

    let open = w.state.store.find_application(open.id).await.unwrap().unwrap();
    assert_eq!(open.status, ApplicationStatus::Cancelled);
    assert!(open.job_removed);
    let interview = w
        .state
        .store
        .find_interview(scheduled.interview.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(interview.status, InterviewStatus::Cancelled);

    let hired = w.state.store.find_application(hired.id).await.unwrap().unwrap();
    assert_eq!(hired.status, ApplicationStatus::Hired);
    assert!(!hired.job_removed);

    let err = w
        .state
        .application_service
        .submit(&w.seeker, w.job.id, Some("/x.pdf".into()), Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn listings_are_scoped_to_the_actor() {
    let w = world().await;
    let a = submit(&w, &w.seeker).await;
    let b = submit(&w, &w.other_seeker).await;
    let svc = &w.state.application_service;

    let mine = svc.list_mine(&w.seeker, None).await.unwrap();
    assert_eq!(mine.iter().map(|x| x.id).collect::<Vec<_>>(), vec![a.id]);

    let received = svc.list_received(&w.recruiter, None).await.unwrap();
    assert_eq!(received.len(), 2);
    let received = svc.list_received(&w.other_recruiter, None).await.unwrap();
    assert!(received.is_empty());
    let everything = svc.list_received(&w.admin, None).await.unwrap();
    assert_eq!(everything.len(), 2);

    advance(&w, b.id, ApplicationStatus::Reviewed).await;
    let reviewed = svc
        .list_for_job(&w.recruiter, w.job.id, Some(ApplicationStatus::Reviewed))
        .await
        .unwrap();
    assert_eq!(reviewed.iter().map(|x| x.id).collect::<Vec<_>>(), vec![b.id]);

    let err = svc.list_mine(&w.recruiter, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = svc.list_received(&w.seeker, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn interview_listing_and_view_are_scoped() {
    let w = world().await;
    let app = submit(&w, &w.seeker).await;
    let scheduled = w
        .state
        .interview_service
        .schedule(&w.recruiter, app.id, details())
        .await
        .unwrap()
        .value;
    let svc = &w.state.interview_service;

    assert_eq!(svc.list(&w.seeker).await.unwrap().len(), 1);
    assert_eq!(svc.list(&w.recruiter).await.unwrap().len(), 1);
    assert_eq!(svc.list(&w.admin).await.unwrap().len(), 1);
    assert!(svc.list(&w.other_seeker).await.unwrap().is_empty());
    assert!(svc.list(&w.other_recruiter).await.unwrap().is_empty());

    let err = svc
        .view(&w.other_seeker, scheduled.interview.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_ok!(svc.view(&w.seeker, scheduled.interview.id).await);

    let err = svc
        .remove(&w.seeker, scheduled.interview.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_advances_do_not_both_win() {
    let w = world().await;

    for _ in 0..20 {
        let app_id = submit(&w, &w.seeker).await.id;
        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        let racers: Vec<_> = [ApplicationStatus::Hired, ApplicationStatus::Rejected]
            .into_iter()
            .map(|target| {
                let svc = w.state.application_service.clone();
                let recruiter = w.recruiter;
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    svc.advance(&recruiter, app_id, target, None)
                        .await
                        .map(|outcome| outcome.value.application.status)
                })
            })
            .collect();

        let mut winners = Vec::new();
        for racer in racers {
            match racer.await.unwrap() {
                Ok(status) => winners.push(status),
                Err(e) => assert_eq!(e.kind(), ErrorKind::Conflict),
            }
        }
        assert_eq!(winners.len(), 1, "exactly one terminal outcome must win");

        let stored = w.state.store.find_application(app_id).await.unwrap().unwrap();
        assert_eq!(stored.status, winners[0]);

        // Free the (applicant, job) slot for the next round.
        w.state
            .store
            .repair_application(app_id, ApplicationStatus::Cancelled, None, Utc::now())
            .await
            .unwrap();
    }
}
