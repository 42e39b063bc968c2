mod common;

use common::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;

use ponto::AttendanceError;
use ponto::identity::{AdminSeed, MAX_GENERATION_ATTEMPTS};
use ponto::model::{Branch, EmployeeUpdate, Matricula, NewEmployee, Role, Shift};
use ponto::store::PersistencePort;

fn new_employee(name: &str, email: &str, role: Role) -> NewEmployee {
    NewEmployee {
        name: name.into(),
        email: email.into(),
        document: "390.533.447-05".into(),
        role,
        branch: Branch::Filial,
        shift: Shift::Afternoon,
        sex: None,
    }
}

/// Pre-populates the store with the first `taken` candidates the seeded
/// generator will draw and returns them plus the next one.
async fn occupy_first_draws(
    store: &dyn PersistencePort,
    seed: u64,
    taken: usize,
) -> (Vec<Matricula>, Matricula) {
    let mut preview = StdRng::seed_from_u64(seed);
    let draws: Vec<Matricula> = (0..=taken).map(|_| Matricula::random(&mut preview)).collect();
    let distinct: HashSet<_> = draws.iter().collect();
    assert_eq!(distinct.len(), draws.len(), "seed draws must be distinct");

    for m in &draws[..taken] {
        store.create_employee(employee(m.as_str(), Role::Employee)).await.unwrap();
    }
    (draws[..taken].to_vec(), draws[taken].clone())
}

#[actix_web::test]
async fn generation_skips_every_taken_candidate() {
    let h = Harness::at(local(2026, 10, 19, 8, 0));
    let (taken, expected) = occupy_first_draws(h.store.as_ref(), 7, 9).await;

    let mut rng = StdRng::seed_from_u64(7);
    let got = h.identities.generate_matricula(&mut rng).await.unwrap();
    assert_eq!(got, expected);
    assert!(!taken.contains(&got));
}

#[actix_web::test]
async fn generation_skips_taken_candidates_with_a_warm_index() {
    let h = Harness::at(local(2026, 10, 19, 8, 0));
    let (taken, expected) = occupy_first_draws(h.store.as_ref(), 11, 5).await;
    assert_eq!(h.identities.warmup().await.unwrap(), 5);

    let mut rng = StdRng::seed_from_u64(11);
    let got = h.identities.generate_matricula(&mut rng).await.unwrap();
    assert_eq!(got, expected);
    assert!(!taken.contains(&got));
}

#[actix_web::test]
async fn generation_gives_up_after_bounded_attempts() {
    let h = Harness::at(local(2026, 10, 19, 8, 0));
    occupy_first_draws(h.store.as_ref(), 3, MAX_GENERATION_ATTEMPTS).await;

    let mut rng = StdRng::seed_from_u64(3);
    assert!(matches!(
        h.identities.generate_matricula(&mut rng).await,
        Err(AttendanceError::GenerationExhausted { attempts }) if attempts == MAX_GENERATION_ATTEMPTS
    ));
}

#[actix_web::test]
async fn create_draws_again_when_the_store_holds_a_number_the_index_missed() {
    let h = Harness::at(local(2026, 10, 19, 8, 0));
    let rh = seed(h.store.as_ref(), "20000-01", Role::Hr).await;
    assert_eq!(h.identities.warmup().await.unwrap(), 1);

    // Written behind the warmed index's back, as another instance would.
    let mut preview = StdRng::seed_from_u64(42);
    let first = Matricula::random(&mut preview);
    let second = Matricula::random(&mut preview);
    assert_ne!(first, second);
    h.store
        .create_employee(employee(first.as_str(), Role::Employee))
        .await
        .unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let created = h
        .identities
        .create_with_rng(&rh, new_employee("Dora Lima", "dora@x.com", Role::Employee), &mut rng)
        .await
        .unwrap();
    assert_eq!(created.matricula, second);
    assert_eq!(h.store.list_employees().await.unwrap().len(), 3);

    // The stale number is now known to the index as well.
    let mut rng = StdRng::seed_from_u64(42);
    let next = h.identities.generate_matricula(&mut rng).await.unwrap();
    assert_ne!(next, first);
    assert_ne!(next, second);
}

#[actix_web::test]
async fn registration_numbers_are_unique_across_many_creates() {
    let h = Harness::at(local(2026, 10, 19, 8, 0));
    let rh = seed(h.store.as_ref(), "20000-01", Role::Hr).await;

    let mut seen = HashSet::new();
    for i in 0..50 {
        let created = h
            .identities
            .create(&rh, new_employee("Fulano de Tal", &format!("f{i}@x.com"), Role::Employee))
            .await
            .unwrap();
        assert!(seen.insert(created.matricula));
    }
    assert_eq!(h.store.list_employees().await.unwrap().len(), 51);
}

#[actix_web::test]
async fn create_normalizes_and_validates_before_storing() {
    let h = Harness::at(local(2026, 10, 19, 8, 0));
    let rh = seed(h.store.as_ref(), "20000-01", Role::Hr).await;

    let created = h
        .identities
        .create(&rh, new_employee("  joão   da silva ", " Joao@Empresa.com ", Role::Employee))
        .await
        .unwrap();
    assert_eq!(created.name, "JOÃO DA SILVA");
    assert_eq!(created.email, "joao@empresa.com");
    assert_eq!(created.document, "39053344705");

    let mut bad_doc = new_employee("Ana", "ana@x.com", Role::Employee);
    bad_doc.document = "111.111.111-11".into();
    let blank_name = new_employee("  ", "bia@x.com", Role::Employee);
    for bad in [bad_doc, blank_name] {
        assert!(matches!(
            h.identities.create(&rh, bad).await,
            Err(AttendanceError::Validation(_))
        ));
    }
    assert_eq!(h.store.list_employees().await.unwrap().len(), 2);

    assert!(matches!(
        h.identities
            .create(&rh, new_employee("Outro", "joao@empresa.com", Role::Employee))
            .await,
        Err(AttendanceError::Conflict(_))
    ));
}

#[actix_web::test]
async fn only_privileged_roles_manage_employees() {
    let h = Harness::at(local(2026, 10, 19, 8, 0));
    let ana = seed(h.store.as_ref(), "10000-01", Role::Employee).await;
    let rh = seed(h.store.as_ref(), "20000-01", Role::Hr).await;
    let admin = seed(h.store.as_ref(), "30000-01", Role::Admin).await;

    assert!(matches!(
        h.identities
            .create(&ana, new_employee("Bia", "bia@x.com", Role::Employee))
            .await,
        Err(AttendanceError::Permission(_))
    ));
    assert!(matches!(
        h.identities.list(&ana).await,
        Err(AttendanceError::Permission(_))
    ));
    assert!(h.identities.get(&ana, &ana.matricula).await.is_ok());
    assert!(matches!(
        h.identities.get(&ana, &rh.matricula).await,
        Err(AttendanceError::Permission(_))
    ));

    // HR cannot mint administrators; an admin can.
    assert!(matches!(
        h.identities
            .create(&rh, new_employee("Chefe", "chefe@x.com", Role::Admin))
            .await,
        Err(AttendanceError::Permission(_))
    ));
    assert!(
        h.identities
            .create(&admin, new_employee("Chefe", "chefe@x.com", Role::Admin))
            .await
            .is_ok()
    );
}

#[actix_web::test]
async fn hr_cannot_demote_or_remove_an_administrator() {
    let h = Harness::at(local(2026, 10, 19, 8, 0));
    let rh = seed(h.store.as_ref(), "20000-01", Role::Hr).await;
    let admin = seed(h.store.as_ref(), "30000-01", Role::Admin).await;
    let other_admin = seed(h.store.as_ref(), "30000-02", Role::Admin).await;

    let demote = EmployeeUpdate {
        role: Some(Role::Employee),
        ..Default::default()
    };
    assert!(matches!(
        h.identities.update(&rh, &admin.matricula, demote.clone()).await,
        Err(AttendanceError::Permission(_))
    ));
    assert!(matches!(
        h.identities.delete(&rh, &admin.matricula).await,
        Err(AttendanceError::Permission(_))
    ));

    let stored = h.store.find_employee(&admin.matricula).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Admin);

    // Another administrator may do both.
    let demoted = h
        .identities
        .update(&other_admin, &admin.matricula, demote)
        .await
        .unwrap();
    assert_eq!(demoted.role, Role::Employee);
    h.identities
        .delete(&other_admin, &admin.matricula)
        .await
        .unwrap();
    assert!(h.store.find_employee(&admin.matricula).await.unwrap().is_none());
}

#[actix_web::test]
async fn update_changes_fields_but_never_the_registration_number() {
    let h = Harness::at(local(2026, 10, 19, 8, 0));
    let ana = seed(h.store.as_ref(), "10000-01", Role::Employee).await;
    let rh = seed(h.store.as_ref(), "20000-01", Role::Hr).await;

    let updated = h
        .identities
        .update(
            &rh,
            &ana.matricula,
            EmployeeUpdate {
                name: Some("ana maria".into()),
                shift: Some(Shift::Afternoon),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.matricula, ana.matricula);
    assert_eq!(updated.name, "ANA MARIA");
    assert_eq!(updated.shift, Shift::Afternoon);

    assert!(matches!(
        h.identities
            .update(&rh, &ana.matricula, EmployeeUpdate::default())
            .await,
        Err(AttendanceError::Validation(_))
    ));
    assert!(matches!(
        h.identities
            .update(
                &rh,
                &ana.matricula,
                EmployeeUpdate {
                    email: Some("".into()),
                    ..Default::default()
                }
            )
            .await,
        Err(AttendanceError::Validation(_))
    ));
    assert!(matches!(
        h.identities
            .update(
                &rh,
                &matricula("99999-99"),
                EmployeeUpdate {
                    shift: Some(Shift::Morning),
                    ..Default::default()
                }
            )
            .await,
        Err(AttendanceError::NotFound(_))
    ));
}

#[actix_web::test]
async fn search_matches_name_substring_and_number_prefix() {
    let h = Harness::at(local(2026, 10, 19, 8, 0));
    let rh = seed(h.store.as_ref(), "20000-01", Role::Hr).await;
    h.identities
        .create(&rh, new_employee("Carla Mendes", "carla@x.com", Role::Employee))
        .await
        .unwrap();

    let by_name = h.identities.search(&rh, "mend").await.unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].name, "CARLA MENDES");

    let by_number = h.identities.search(&rh, "20000").await.unwrap();
    assert_eq!(by_number.len(), 1);
    assert_eq!(by_number[0].matricula, rh.matricula);

    assert_eq!(h.identities.search(&rh, "  ").await.unwrap().len(), 2);
}

#[actix_web::test]
async fn deleting_an_employee_keeps_their_punches() {
    let h = Harness::at(local(2026, 10, 19, 8, 0));
    let ana = seed(h.store.as_ref(), "10000-01", Role::Employee).await;
    let admin = seed(h.store.as_ref(), "30000-01", Role::Admin).await;

    let punch = h
        .sessions
        .record_punch(&ana, &ana.matricula, None)
        .await
        .unwrap()
        .punch;

    assert!(matches!(
        h.identities.delete(&admin, &admin.matricula).await,
        Err(AttendanceError::Validation(_))
    ));
    h.identities.delete(&admin, &ana.matricula).await.unwrap();

    assert!(h.store.find_employee(&ana.matricula).await.unwrap().is_none());
    assert!(h.store.get_punch(&punch.id).await.unwrap().is_some());
    assert!(matches!(
        h.identities.delete(&admin, &ana.matricula).await,
        Err(AttendanceError::NotFound(_))
    ));
}

#[actix_web::test]
async fn admin_bootstrap_is_idempotent() {
    let h = Harness::at(local(2026, 10, 19, 8, 0));
    let seed = AdminSeed {
        name: "Administrador".into(),
        email: "administrador".into(),
        document: "123.456.789-09".into(),
    };

    let first = h.identities.bootstrap_admin(&seed).await.unwrap();
    assert_eq!(first.role, Role::Admin);
    assert_eq!(first.name, "ADMINISTRADOR");

    let second = h.identities.bootstrap_admin(&seed).await.unwrap();
    assert_eq!(second.matricula, first.matricula);
    assert_eq!(h.store.list_employees().await.unwrap().len(), 1);
}
